//! Line item handlers. Every write moves stock on the sold variant in the
//! same transaction; a shortfall comes back as `409 insufficient_stock`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use lookstyle_catalog::LineItem;
use lookstyle_core::{LineItemChanges, NewLineItem};

use crate::middleware::RequestId;

use super::{map_catalog_error, ApiError, ApiResponse, AppState, ResponseMeta};

/// POST /api/v1/line-items
pub(in crate::api) async fn create_line_item(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<NewLineItem>,
) -> Result<(StatusCode, Json<ApiResponse<LineItem>>), ApiError> {
    let item = state
        .line_items
        .create(body)
        .await
        .map_err(|e| map_catalog_error(&req_id.0, &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: item,
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// PATCH /api/v1/line-items/{id}
pub(in crate::api) async fn update_line_item(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    Json(body): Json<LineItemChanges>,
) -> Result<Json<ApiResponse<LineItem>>, ApiError> {
    let item = state
        .line_items
        .update(id, body)
        .await
        .map_err(|e| map_catalog_error(&req_id.0, &e))?;

    Ok(Json(ApiResponse {
        data: item,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// DELETE /api/v1/line-items/{id}: returns the removed item.
pub(in crate::api) async fn delete_line_item(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<LineItem>>, ApiError> {
    let item = state
        .line_items
        .delete(id)
        .await
        .map_err(|e| map_catalog_error(&req_id.0, &e))?;

    Ok(Json(ApiResponse {
        data: item,
        meta: ResponseMeta::new(req_id.0),
    }))
}
