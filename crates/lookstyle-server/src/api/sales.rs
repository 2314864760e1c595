use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use lookstyle_catalog::{LineItemDetail, Sale};
use lookstyle_core::{NewSale, SaleChanges};
use serde::Serialize;

use crate::middleware::RequestId;

use super::{map_catalog_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(in crate::api) struct DeletedSale {
    pub id: i64,
    /// Line items removed with the sale; their units went back to stock.
    pub line_items_removed: u64,
}

/// GET /api/v1/sales: newest first.
pub(in crate::api) async fn list_sales(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<Sale>>>, ApiError> {
    let sales = state
        .sales
        .list()
        .await
        .map_err(|e| map_catalog_error(&req_id.0, &e))?;

    Ok(Json(ApiResponse {
        data: sales,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/sales/{id}
pub(in crate::api) async fn get_sale(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Sale>>, ApiError> {
    let sale = state
        .sales
        .get(id)
        .await
        .map_err(|e| map_catalog_error(&req_id.0, &e))?;

    Ok(Json(ApiResponse {
        data: sale,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/sales
pub(in crate::api) async fn create_sale(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<NewSale>,
) -> Result<(StatusCode, Json<ApiResponse<Sale>>), ApiError> {
    let sale = state
        .sales
        .create(body)
        .await
        .map_err(|e| map_catalog_error(&req_id.0, &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: sale,
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// PATCH /api/v1/sales/{id}: sparse update of the header fields.
pub(in crate::api) async fn update_sale(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    Json(body): Json<SaleChanges>,
) -> Result<Json<ApiResponse<Sale>>, ApiError> {
    let sale = state
        .sales
        .update(id, body)
        .await
        .map_err(|e| map_catalog_error(&req_id.0, &e))?;

    Ok(Json(ApiResponse {
        data: sale,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// DELETE /api/v1/sales/{id}
pub(in crate::api) async fn delete_sale(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<DeletedSale>>, ApiError> {
    let removed = state
        .sales
        .delete(id)
        .await
        .map_err(|e| map_catalog_error(&req_id.0, &e))?;

    Ok(Json(ApiResponse {
        data: DeletedSale {
            id,
            line_items_removed: removed,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/sales/{id}/line-items
pub(in crate::api) async fn list_sale_line_items(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<LineItemDetail>>>, ApiError> {
    let items = state
        .sales
        .list_line_items(id)
        .await
        .map_err(|e| map_catalog_error(&req_id.0, &e))?;

    Ok(Json(ApiResponse {
        data: items,
        meta: ResponseMeta::new(req_id.0),
    }))
}
