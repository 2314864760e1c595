//! Database operations for `variant_images`, the local references to
//! externally hosted variant images.

use chrono::{DateTime, Utc};
use sqlx::PgExecutor;

use crate::DbError;

/// A row from the `variant_images` table.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct VariantImageRow {
    pub id: i64,
    pub variant_id: i64,
    pub url: String,
    /// Image store identifier; `NULL` for references written before it was
    /// recorded.
    pub asset_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Inserts an image reference and returns the stored row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_variant_image<'e, E>(
    executor: E,
    variant_id: i64,
    url: &str,
    asset_id: &str,
) -> Result<VariantImageRow, DbError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, VariantImageRow>(
        "INSERT INTO variant_images (variant_id, url, asset_id) \
         VALUES ($1, $2, $3) \
         RETURNING id, variant_id, url, asset_id, created_at",
    )
    .bind(variant_id)
    .bind(url)
    .bind(asset_id)
    .fetch_one(executor)
    .await?;
    Ok(row)
}

/// Lists the image references of a variant in upload order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_variant_images<'e, E>(
    executor: E,
    variant_id: i64,
) -> Result<Vec<VariantImageRow>, DbError>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query_as::<_, VariantImageRow>(
        "SELECT id, variant_id, url, asset_id, created_at \
         FROM variant_images \
         WHERE variant_id = $1 \
         ORDER BY id",
    )
    .bind(variant_id)
    .fetch_all(executor)
    .await?;
    Ok(rows)
}

/// Deletes every image reference of a variant and returns the removed rows,
/// so the caller can clean up the external assets after commit.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_variant_images<'e, E>(
    executor: E,
    variant_id: i64,
) -> Result<Vec<VariantImageRow>, DbError>
where
    E: PgExecutor<'e>,
{
    let mut rows = sqlx::query_as::<_, VariantImageRow>(
        "DELETE FROM variant_images \
         WHERE variant_id = $1 \
         RETURNING id, variant_id, url, asset_id, created_at",
    )
    .bind(variant_id)
    .fetch_all(executor)
    .await?;
    rows.sort_by_key(|row| row.id);
    Ok(rows)
}
