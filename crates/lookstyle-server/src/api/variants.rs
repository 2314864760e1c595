//! Variant handlers. Writes take `multipart/form-data`: scalar fields as
//! text parts, `sizes` as a JSON array of `{size_id, quantity}` and up to
//! five files under `images`.

use std::collections::HashMap;

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    Extension, Json,
};
use lookstyle_catalog::VariantView;
use lookstyle_core::{NewVariant, SizeQuantity, VariantChanges, VariantStatus};
use lookstyle_images::ImageUpload;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::middleware::RequestId;

use super::{map_catalog_error, ApiError, ApiResponse, AppState, ResponseMeta};

const MAX_IMAGES: usize = 5;
const IMAGE_FIELD: &str = "images";

// ---------------------------------------------------------------------------
// Form parsing
// ---------------------------------------------------------------------------

/// A variant write body after the multipart stream has been drained.
#[derive(Debug, Default)]
struct VariantForm {
    fields: HashMap<String, String>,
    images: Vec<ImageUpload>,
}

impl VariantForm {
    async fn read(rid: &str, mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| multipart_error(rid, &e))?
        {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };

            if name == IMAGE_FIELD {
                if form.images.len() == MAX_IMAGES {
                    return Err(ApiError::validation(
                        rid,
                        format!("at most {MAX_IMAGES} images per request"),
                    ));
                }
                let file_name = field.file_name().unwrap_or("image").to_owned();
                let content_type = field.content_type().map(str::to_owned);
                let bytes = field.bytes().await.map_err(|e| multipart_error(rid, &e))?;
                // Browsers send an empty part for an untouched file input.
                if bytes.is_empty() {
                    continue;
                }
                form.images
                    .push(ImageUpload::new(file_name, content_type, bytes.to_vec()));
            } else {
                let text = field.text().await.map_err(|e| multipart_error(rid, &e))?;
                form.fields.insert(name, text.trim().to_owned());
            }
        }

        Ok(form)
    }

    fn text(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    fn optional_id(&self, rid: &str, key: &str) -> Result<Option<i64>, ApiError> {
        match self.text(key) {
            None | Some("") => Ok(None),
            Some(raw) => raw.parse::<i64>().map(Some).map_err(|_| {
                ApiError::validation(rid, format!("'{key}' must be an integer, got '{raw}'"))
            }),
        }
    }

    fn required_id(&self, rid: &str, key: &str) -> Result<i64, ApiError> {
        self.optional_id(rid, key)?
            .ok_or_else(|| ApiError::validation(rid, format!("'{key}' is required")))
    }

    /// `None` when the field is absent, `Some(None)` when it is sent empty or
    /// as `null`.
    fn price(&self, rid: &str) -> Result<Option<Option<Decimal>>, ApiError> {
        match self.text("price") {
            None => Ok(None),
            Some("" | "null") => Ok(Some(None)),
            Some(raw) => raw.parse::<Decimal>().map(|p| Some(Some(p))).map_err(|_| {
                ApiError::validation(rid, format!("'price' must be a decimal, got '{raw}'"))
            }),
        }
    }

    fn status(&self, rid: &str) -> Result<Option<VariantStatus>, ApiError> {
        self.text("status")
            .map(str::parse::<VariantStatus>)
            .transpose()
            .map_err(|e| ApiError::validation(rid, e.to_string()))
    }

    fn sizes(&self, rid: &str) -> Result<Option<Vec<SizeQuantity>>, ApiError> {
        match self.text("sizes") {
            None => Ok(None),
            Some("") => Ok(Some(Vec::new())),
            Some(raw) => serde_json::from_str(raw).map(Some).map_err(|e| {
                ApiError::validation(
                    rid,
                    format!("'sizes' must be a JSON array of {{size_id, quantity}}: {e}"),
                )
            }),
        }
    }

    fn into_new_variant(self, rid: &str) -> Result<(NewVariant, Vec<ImageUpload>), ApiError> {
        let input = NewVariant {
            product_id: self.required_id(rid, "product_id")?,
            color_id: self.required_id(rid, "color_id")?,
            price: self.price(rid)?.flatten(),
            status: self.status(rid)?,
            sizes: self.sizes(rid)?.unwrap_or_default(),
        };
        Ok((input, self.images))
    }

    fn into_changes(self, rid: &str) -> Result<(VariantChanges, Vec<ImageUpload>), ApiError> {
        let changes = VariantChanges {
            color_id: self.optional_id(rid, "color_id")?,
            price: self.price(rid)?,
            status: self.status(rid)?,
            sizes: self.sizes(rid)?,
        };
        Ok((changes, self.images))
    }
}

fn multipart_error(rid: &str, error: &MultipartError) -> ApiError {
    ApiError::validation(rid, format!("malformed multipart body: {}", error.body_text()))
}

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(in crate::api) struct DeletedVariant {
    pub id: i64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/variants: every variant, newest first.
pub(in crate::api) async fn list_variants(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<VariantView>>>, ApiError> {
    let views = state
        .variants
        .list()
        .await
        .map_err(|e| map_catalog_error(&req_id.0, &e))?;

    Ok(Json(ApiResponse {
        data: views,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/variants/{id}
pub(in crate::api) async fn get_variant(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<VariantView>>, ApiError> {
    let view = state
        .variants
        .get(id)
        .await
        .map_err(|e| map_catalog_error(&req_id.0, &e))?;

    Ok(Json(ApiResponse {
        data: view,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/products/{id}/variants
pub(in crate::api) async fn list_product_variants(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(product_id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<VariantView>>>, ApiError> {
    let views = state
        .variants
        .list_by_product(product_id)
        .await
        .map_err(|e| map_catalog_error(&req_id.0, &e))?;

    Ok(Json(ApiResponse {
        data: views,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/variants
pub(in crate::api) async fn create_variant(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<VariantView>>), ApiError> {
    let rid = &req_id.0;
    let (input, uploads) = VariantForm::read(rid, multipart)
        .await?
        .into_new_variant(rid)?;

    let view = state
        .variants
        .create(input, uploads)
        .await
        .map_err(|e| map_catalog_error(rid, &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: view,
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// PATCH /api/v1/variants/{id}: sparse update. Any uploaded image replaces
/// the whole image set.
pub(in crate::api) async fn update_variant(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<VariantView>>, ApiError> {
    let rid = &req_id.0;
    let (changes, uploads) = VariantForm::read(rid, multipart)
        .await?
        .into_changes(rid)?;

    let outcome = state
        .variants
        .update(id, changes, uploads)
        .await
        .map_err(|e| map_catalog_error(rid, &e))?;

    Ok(Json(ApiResponse {
        data: outcome.value,
        meta: ResponseMeta::new(req_id.0).with_warnings(outcome.warnings),
    }))
}

/// DELETE /api/v1/variants/{id}
pub(in crate::api) async fn delete_variant(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<DeletedVariant>>, ApiError> {
    let outcome = state
        .variants
        .delete(id)
        .await
        .map_err(|e| map_catalog_error(&req_id.0, &e))?;

    Ok(Json(ApiResponse {
        data: DeletedVariant { id },
        meta: ResponseMeta::new(req_id.0).with_warnings(outcome.warnings),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> VariantForm {
        VariantForm {
            fields: pairs
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect(),
            images: Vec::new(),
        }
    }

    #[test]
    fn new_variant_requires_product_and_color() {
        let err = form(&[("color_id", "2")])
            .into_new_variant("req")
            .unwrap_err();
        assert_eq!(err.error.code, "validation_error");
        assert!(err.error.message.contains("product_id"));
    }

    #[test]
    fn new_variant_parses_all_fields() {
        let (input, images) = form(&[
            ("product_id", "7"),
            ("color_id", "2"),
            ("price", "49.90"),
            ("status", "Activo"),
            ("sizes", r#"[{"size_id":1,"quantity":4},{"size_id":3,"quantity":6}]"#),
        ])
        .into_new_variant("req")
        .expect("valid form");

        assert_eq!(input.product_id, 7);
        assert_eq!(input.color_id, 2);
        assert_eq!(input.price, Some(Decimal::new(4990, 2)));
        assert_eq!(input.status, Some(VariantStatus::Active));
        assert_eq!(
            input.sizes,
            vec![SizeQuantity::new(1, 4), SizeQuantity::new(3, 6)]
        );
        assert!(images.is_empty());
    }

    #[test]
    fn empty_price_clears_on_update_and_is_absent_on_create() {
        let (changes, _) = form(&[("price", "")]).into_changes("req").expect("changes");
        assert_eq!(changes.price, Some(None));

        let (changes, _) = form(&[]).into_changes("req").expect("changes");
        assert_eq!(changes.price, None);
        assert_eq!(changes.sizes, None);

        let (input, _) = form(&[("product_id", "1"), ("color_id", "1"), ("price", "")])
            .into_new_variant("req")
            .expect("input");
        assert_eq!(input.price, None);
    }

    #[test]
    fn malformed_values_are_validation_errors() {
        for pairs in [
            [("color_id", "navy")],
            [("price", "cheap")],
            [("sizes", "S,M,L")],
            [("status", "   ")],
        ] {
            let err = form(&pairs).into_changes("req").unwrap_err();
            assert_eq!(err.error.code, "validation_error", "{pairs:?}");
        }
    }
}
