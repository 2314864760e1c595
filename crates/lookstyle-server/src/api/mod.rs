mod line_items;
mod sales;
mod variants;

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, patch, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use lookstyle_catalog::{
    CatalogError, CleanupWarning, ErrorKind, LineItemManager, SaleManager, VariantManager,
};
use lookstyle_images::CloudinaryClient;
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::middleware::{request_id, RequestId};

/// Multipart bodies carry up to five images.
const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub variants: Arc<VariantManager<CloudinaryClient>>,
    pub line_items: LineItemManager,
    pub sales: SaleManager,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
    /// Image assets that could not be removed from the store after a
    /// committed write. The write itself succeeded.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<CleanupWarning>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
            warnings: Vec::new(),
        }
    }

    pub(super) fn with_warnings(mut self, warnings: Vec<CleanupWarning>) -> Self {
        self.warnings = warnings;
        self
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }

    pub(super) fn validation(request_id: &str, message: impl Into<String>) -> Self {
        Self::new(request_id, "validation_error", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "insufficient_stock" => StatusCode::CONFLICT,
            "asset_upload_failed" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

/// Translates a catalog failure into the JSON error envelope.
///
/// Validation, not-found and stock messages are safe to show to the caller.
/// Storage and image-store details are logged and replaced with a generic
/// message.
pub(super) fn map_catalog_error(request_id: &str, error: &CatalogError) -> ApiError {
    match error.kind() {
        ErrorKind::Validation => ApiError::validation(request_id, error.to_string()),
        ErrorKind::NotFound => ApiError::new(request_id, "not_found", error.to_string()),
        ErrorKind::InsufficientStock => {
            ApiError::new(request_id, "insufficient_stock", error.to_string())
        }
        ErrorKind::AssetUpload => {
            tracing::error!(error = %error, request_id, "image store rejected upload");
            ApiError::new(request_id, "asset_upload_failed", "image upload failed")
        }
        ErrorKind::Storage => {
            tracing::error!(error = %error, request_id, "database query failed");
            ApiError::new(request_id, "internal_error", "database query failed")
        }
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn catalog_router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/variants",
            get(variants::list_variants).post(variants::create_variant),
        )
        .route(
            "/api/v1/variants/{id}",
            get(variants::get_variant)
                .patch(variants::update_variant)
                .delete(variants::delete_variant),
        )
        .route(
            "/api/v1/products/{id}/variants",
            get(variants::list_product_variants),
        )
        .route("/api/v1/sales", get(sales::list_sales).post(sales::create_sale))
        .route(
            "/api/v1/sales/{id}",
            get(sales::get_sale)
                .patch(sales::update_sale)
                .delete(sales::delete_sale),
        )
        .route(
            "/api/v1/sales/{id}/line-items",
            get(sales::list_sale_line_items),
        )
        .route("/api/v1/line-items", post(line_items::create_line_item))
        .route(
            "/api/v1/line-items/{id}",
            patch(line_items::update_line_item).delete(line_items::delete_line_item),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}

pub fn build_app(state: AppState) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(catalog_router())
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match lookstyle_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

#[cfg(test)]
#[path = "routes_test.rs"]
mod tests;
