//! Variant create/update/delete with size breakdown and image reconciliation.

use chrono::{DateTime, Utc};
use lookstyle_core::{
    total_quantity, CoreError, NewVariant, SizeQuantity, VariantChanges, VariantStatus,
};
use lookstyle_db::{
    color_exists, count_line_items_for_variant, delete_variant, delete_variant_images,
    delete_variant_sizes, get_variant_detail, insert_variant, insert_variant_image,
    list_variant_details, list_variant_details_by_product, list_variant_images,
    list_variant_sizes, lock_variant, missing_size_ids, product_exists, replace_variant_sizes,
    set_stock_quantity, sold_quantity_for_variant, update_variant, VariantDetailRow,
    VariantImageRow, VariantSizeRow,
};
use lookstyle_images::{ImageStore, ImageUpload, StoredImage};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgConnection, PgPool};

use crate::reconcile::{discard_assets, StaleAsset};
use crate::{CatalogError, Reconciled};

/// A variant with its product and color names, size breakdown and images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantView {
    pub id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub color_id: i64,
    pub color_name: String,
    /// Override price; `None` sells at the product base price.
    pub price: Option<Decimal>,
    pub effective_price: Decimal,
    pub status: VariantStatus,
    pub stock_quantity: i32,
    pub sizes: Vec<SizeView>,
    pub images: Vec<ImageView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SizeView {
    pub size_id: i64,
    pub size_name: String,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageView {
    pub id: i64,
    pub url: String,
    pub asset_id: Option<String>,
}

impl VariantView {
    fn compose(
        row: VariantDetailRow,
        sizes: Vec<VariantSizeRow>,
        images: Vec<VariantImageRow>,
    ) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id,
            product_name: row.product_name,
            color_id: row.color_id,
            color_name: row.color_name,
            price: row.price,
            effective_price: row.effective_price,
            status: stored_status(row.id, &row.status),
            stock_quantity: row.stock_quantity,
            sizes: sizes
                .into_iter()
                .map(|s| SizeView {
                    size_id: s.size_id,
                    size_name: s.size_name,
                    quantity: s.quantity,
                })
                .collect(),
            images: images
                .into_iter()
                .map(|i| ImageView {
                    id: i.id,
                    url: i.url,
                    asset_id: i.asset_id,
                })
                .collect(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }

    /// Size breakdown as submitted, ordered by size id.
    #[must_use]
    pub fn size_quantities(&self) -> Vec<SizeQuantity> {
        self.sizes
            .iter()
            .map(|s| SizeQuantity::new(s.size_id, s.quantity))
            .collect()
    }
}

/// Orchestrates variant writes against the database and the image store.
pub struct VariantManager<S> {
    pool: PgPool,
    images: S,
    folder: String,
}

impl<S: ImageStore> VariantManager<S> {
    pub fn new(pool: PgPool, images: S, folder: impl Into<String>) -> Self {
        Self {
            pool,
            images,
            folder: folder.into(),
        }
    }

    /// Creates a variant with its size breakdown and images in one
    /// transaction. The aggregate stock starts at the breakdown total.
    ///
    /// If anything fails after some images were uploaded, the transaction
    /// rolls back and one delete attempt is made for each uploaded image.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::Validation`] for malformed input or unknown product, color or size ids.
    /// - [`CatalogError::AssetUpload`] if the image store rejects an upload.
    /// - [`CatalogError::Storage`] on database failure.
    pub async fn create(
        &self,
        input: NewVariant,
        uploads: Vec<ImageUpload>,
    ) -> Result<VariantView, CatalogError> {
        input.validate()?;
        let stock = total_quantity(&input.sizes)?;

        let mut tx = self.pool.begin().await?;

        if !product_exists(&mut *tx, input.product_id).await? {
            return Err(CatalogError::Validation(format!(
                "product {} does not exist",
                input.product_id
            )));
        }
        ensure_color(&mut tx, input.color_id).await?;
        ensure_sizes(&mut tx, &input.sizes).await?;

        let status = input.status_or_default();
        let row = insert_variant(
            &mut tx,
            input.product_id,
            input.color_id,
            input.price,
            status.as_str(),
            stock,
        )
        .await?;
        replace_variant_sizes(&mut tx, row.id, &input.sizes).await?;

        let mut uploaded = Vec::new();
        let outcome = async {
            self.attach_images(&mut tx, row.id, uploads, &mut uploaded).await?;
            let view = load_view(&mut tx, row.id).await?;
            tx.commit().await?;
            Ok::<_, CatalogError>(view)
        }
        .await;

        match outcome {
            Ok(view) => {
                tracing::info!(
                    variant_id = view.id,
                    product_id = view.product_id,
                    sizes = view.sizes.len(),
                    images = view.images.len(),
                    "variant created"
                );
                Ok(view)
            }
            Err(e) => {
                self.abandon_uploads(uploaded).await;
                Err(e)
            }
        }
    }

    /// Applies a partial update.
    ///
    /// A supplied size breakdown replaces the stored one and recounts the
    /// aggregate stock as the new total less the units already sold. A non-empty `uploads` replaces every image: the old
    /// references are deleted with the transaction and their assets are
    /// deleted from the store after commit, best-effort.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::NotFound`] if the variant does not exist.
    /// - [`CatalogError::Validation`] for malformed input or unknown color or size ids.
    /// - [`CatalogError::InsufficientStock`] if the new breakdown holds fewer
    ///   units than sale line items already took.
    /// - [`CatalogError::AssetUpload`] if the image store rejects an upload.
    /// - [`CatalogError::Storage`] on database failure.
    pub async fn update(
        &self,
        id: i64,
        changes: VariantChanges,
        uploads: Vec<ImageUpload>,
    ) -> Result<Reconciled<VariantView>, CatalogError> {
        changes.validate()?;

        let mut tx = self.pool.begin().await?;
        let current = lock_variant(&mut tx, id)
            .await?
            .ok_or_else(|| CatalogError::not_found("variant", id))?;

        if changes.touches_row() {
            let color_id = changes.color_id.unwrap_or(current.color_id);
            if color_id != current.color_id {
                ensure_color(&mut tx, color_id).await?;
            }
            let price = changes.price.unwrap_or(current.price);
            let status = changes
                .status
                .as_ref()
                .map_or(current.status.as_str(), VariantStatus::as_str);
            update_variant(&mut tx, id, color_id, price, status).await?;
        }

        if let Some(sizes) = &changes.sizes {
            ensure_sizes(&mut tx, sizes).await?;
            replace_variant_sizes(&mut tx, id, sizes).await?;
            recount_stock(&mut tx, id, sizes).await?;
        }

        let mut stale = Vec::new();
        let mut uploaded = Vec::new();
        let outcome = async {
            if !uploads.is_empty() {
                stale = delete_variant_images(&mut *tx, id).await?;
                self.attach_images(&mut tx, id, uploads, &mut uploaded).await?;
            }
            let view = load_view(&mut tx, id).await?;
            tx.commit().await?;
            Ok::<_, CatalogError>(view)
        }
        .await;

        let view = match outcome {
            Ok(view) => view,
            Err(e) => {
                self.abandon_uploads(uploaded).await;
                return Err(e);
            }
        };

        let warnings = discard_assets(&self.images, &self.folder, stale_assets(stale)).await;
        tracing::info!(
            variant_id = id,
            replaced_sizes = changes.sizes.is_some(),
            new_images = uploaded.len(),
            cleanup_warnings = warnings.len(),
            "variant updated"
        );
        Ok(Reconciled {
            value: view,
            warnings,
        })
    }

    /// Deletes a variant with its sizes and image references, then deletes
    /// the image assets from the store, best-effort.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::NotFound`] if the variant does not exist.
    /// - [`CatalogError::Validation`] if sale line items still reference it.
    /// - [`CatalogError::Storage`] on database failure.
    pub async fn delete(&self, id: i64) -> Result<Reconciled<()>, CatalogError> {
        let mut tx = self.pool.begin().await?;
        lock_variant(&mut tx, id)
            .await?
            .ok_or_else(|| CatalogError::not_found("variant", id))?;

        let sold = count_line_items_for_variant(&mut *tx, id).await?;
        if sold > 0 {
            return Err(CatalogError::Validation(format!(
                "variant {id} is referenced by {sold} sale line item(s)"
            )));
        }

        let images = delete_variant_images(&mut *tx, id).await?;
        let sizes = delete_variant_sizes(&mut *tx, id).await?;
        delete_variant(&mut tx, id).await?;
        tx.commit().await?;

        let image_count = images.len();
        let warnings = discard_assets(&self.images, &self.folder, stale_assets(images)).await;
        tracing::info!(
            variant_id = id,
            sizes,
            images = image_count,
            cleanup_warnings = warnings.len(),
            "variant deleted"
        );
        Ok(Reconciled {
            value: (),
            warnings,
        })
    }

    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] if the variant does not exist, or
    /// [`CatalogError::Storage`] on database failure.
    pub async fn get(&self, id: i64) -> Result<VariantView, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        load_view(&mut conn, id).await
    }

    /// Every variant, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Storage`] on database failure.
    pub async fn list(&self) -> Result<Vec<VariantView>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let rows = list_variant_details(&mut *conn).await?;
        compose_all(&mut conn, rows).await
    }

    /// Variants of one product, oldest first. Empty for an unknown product.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Storage`] on database failure.
    pub async fn list_by_product(
        &self,
        product_id: i64,
    ) -> Result<Vec<VariantView>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let rows = list_variant_details_by_product(&mut *conn, product_id).await?;
        compose_all(&mut conn, rows).await
    }

    /// Uploads each image in order and records its reference. Successful
    /// uploads are pushed to `uploaded` before the reference insert so the
    /// caller can clean them up if anything later fails.
    async fn attach_images(
        &self,
        conn: &mut PgConnection,
        variant_id: i64,
        uploads: Vec<ImageUpload>,
        uploaded: &mut Vec<StoredImage>,
    ) -> Result<(), CatalogError> {
        for upload in uploads {
            let file_name = upload.file_name.clone();
            let stored = self
                .images
                .upload(upload, &self.folder)
                .await
                .map_err(|e| {
                    tracing::error!(
                        variant_id,
                        file_name = %file_name,
                        error = %e,
                        "image upload failed"
                    );
                    CatalogError::AssetUpload(e)
                })?;
            uploaded.push(stored.clone());
            insert_variant_image(&mut *conn, variant_id, &stored.url, &stored.asset_id).await?;
        }
        Ok(())
    }

    async fn abandon_uploads(&self, uploaded: Vec<StoredImage>) {
        if uploaded.is_empty() {
            return;
        }
        let assets = uploaded
            .into_iter()
            .map(|stored| StaleAsset {
                url: stored.url,
                asset_id: Some(stored.asset_id),
            })
            .collect();
        let warnings = discard_assets(&self.images, &self.folder, assets).await;
        if !warnings.is_empty() {
            tracing::warn!(
                orphaned = warnings.len(),
                "images uploaded for a failed write could not be removed"
            );
        }
    }
}

async fn ensure_color(conn: &mut PgConnection, color_id: i64) -> Result<(), CatalogError> {
    if color_exists(&mut *conn, color_id).await? {
        Ok(())
    } else {
        Err(CatalogError::Validation(format!("color {color_id} does not exist")))
    }
}

async fn ensure_sizes(conn: &mut PgConnection, sizes: &[SizeQuantity]) -> Result<(), CatalogError> {
    let ids: Vec<i64> = sizes.iter().map(|s| s.size_id).collect();
    let missing = missing_size_ids(&mut *conn, &ids).await?;
    if missing.is_empty() {
        return Ok(());
    }
    let listed = missing
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    Err(CatalogError::Validation(format!("unknown size id(s): {listed}")))
}

/// Resets the aggregate stock to the breakdown total minus the units already
/// held by sale line items. The caller holds the variant row lock, so no
/// line item can move stock on this variant until the transaction ends.
async fn recount_stock(
    conn: &mut PgConnection,
    variant_id: i64,
    sizes: &[SizeQuantity],
) -> Result<i32, CatalogError> {
    let total = total_quantity(sizes)?;
    let sold = sold_quantity_for_variant(&mut *conn, variant_id).await?;
    let sold = i32::try_from(sold).map_err(|_| CoreError::QuantityOverflow)?;

    let available = total - sold;
    if available < 0 {
        tracing::info!(variant_id, total, sold, "size breakdown below units already sold");
        return Err(CatalogError::InsufficientStock {
            variant_id,
            requested: sold,
            available: total,
        });
    }
    set_stock_quantity(conn, variant_id, available).await?;
    Ok(available)
}

/// Parses a stored status label. A label that no longer parses (blank) is
/// treated as `inactive` so it is never offered for sale.
fn stored_status(variant_id: i64, raw: &str) -> VariantStatus {
    raw.parse().unwrap_or_else(|e| {
        tracing::warn!(variant_id, raw, error = %e, "unreadable stored variant status");
        VariantStatus::Inactive
    })
}

async fn load_view(conn: &mut PgConnection, id: i64) -> Result<VariantView, CatalogError> {
    let row = get_variant_detail(&mut *conn, id)
        .await?
        .ok_or_else(|| CatalogError::not_found("variant", id))?;
    let sizes = list_variant_sizes(&mut *conn, id).await?;
    let images = list_variant_images(&mut *conn, id).await?;
    Ok(VariantView::compose(row, sizes, images))
}

async fn compose_all(
    conn: &mut PgConnection,
    rows: Vec<VariantDetailRow>,
) -> Result<Vec<VariantView>, CatalogError> {
    let mut views = Vec::with_capacity(rows.len());
    for row in rows {
        let sizes = list_variant_sizes(&mut *conn, row.id).await?;
        let images = list_variant_images(&mut *conn, row.id).await?;
        views.push(VariantView::compose(row, sizes, images));
    }
    Ok(views)
}

fn stale_assets(rows: Vec<VariantImageRow>) -> Vec<StaleAsset> {
    rows.into_iter()
        .map(|row| StaleAsset {
            url: row.url,
            asset_id: row.asset_id,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_status_keeps_known_and_custom_labels() {
        assert_eq!(stored_status(1, "active"), VariantStatus::Active);
        assert_eq!(stored_status(1, "Inactivo"), VariantStatus::Inactive);
        assert_eq!(
            stored_status(1, "preorder"),
            VariantStatus::Other("preorder".to_string())
        );
    }

    #[test]
    fn blank_stored_status_is_not_sellable() {
        assert_eq!(stored_status(1, "   "), VariantStatus::Inactive);
    }
}
