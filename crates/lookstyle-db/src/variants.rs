//! Database operations for `variants` and the reference checks that guard them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgExecutor};

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `variants` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VariantRow {
    pub id: i64,
    pub product_id: i64,
    pub color_id: i64,
    /// `NULL` means the variant sells at the product's base price.
    pub price: Option<Decimal>,
    pub status: String,
    /// Aggregate available stock consumed by sale line items.
    pub stock_quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A variant joined with its product and color names.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VariantDetailRow {
    pub id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub color_id: i64,
    pub color_name: String,
    pub price: Option<Decimal>,
    /// `COALESCE(variants.price, products.base_price)`.
    pub effective_price: Decimal,
    pub status: String,
    pub stock_quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const VARIANT_COLUMNS: &str =
    "id, product_id, color_id, price, status, stock_quantity, created_at, updated_at";

const DETAIL_SELECT: &str = "SELECT v.id, v.product_id, p.name AS product_name, \
            v.color_id, c.name AS color_name, v.price, \
            COALESCE(v.price, p.base_price) AS effective_price, \
            v.status, v.stock_quantity, v.created_at, v.updated_at \
     FROM variants v \
     JOIN products p ON p.id = v.product_id \
     JOIN colors c ON c.id = v.color_id";

// ---------------------------------------------------------------------------
// Reference checks
// ---------------------------------------------------------------------------

/// Returns `true` if a product with `id` exists.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn product_exists<'e, E>(executor: E, id: i64) -> Result<bool, DbError>
where
    E: PgExecutor<'e>,
{
    let exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM products WHERE id = $1)")
            .bind(id)
            .fetch_one(executor)
            .await?;
    Ok(exists)
}

/// Returns `true` if a color with `id` exists.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn color_exists<'e, E>(executor: E, id: i64) -> Result<bool, DbError>
where
    E: PgExecutor<'e>,
{
    let exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM colors WHERE id = $1)")
            .bind(id)
            .fetch_one(executor)
            .await?;
    Ok(exists)
}

/// Returns the subset of `size_ids` that has no row in `sizes`, in input order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn missing_size_ids<'e, E>(executor: E, size_ids: &[i64]) -> Result<Vec<i64>, DbError>
where
    E: PgExecutor<'e>,
{
    if size_ids.is_empty() {
        return Ok(Vec::new());
    }

    let missing = sqlx::query_scalar::<_, i64>(
        "SELECT requested.id \
         FROM UNNEST($1::bigint[]) WITH ORDINALITY AS requested(id, position) \
         WHERE NOT EXISTS (SELECT 1 FROM sizes s WHERE s.id = requested.id) \
         ORDER BY requested.position",
    )
    .bind(size_ids)
    .fetch_all(executor)
    .await?;
    Ok(missing)
}

/// Counts sale line items that still reference a variant.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_line_items_for_variant<'e, E>(
    executor: E,
    variant_id: i64,
) -> Result<i64, DbError>
where
    E: PgExecutor<'e>,
{
    let count =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sale_line_items WHERE variant_id = $1")
            .bind(variant_id)
            .fetch_one(executor)
            .await?;
    Ok(count)
}

/// Sums the units held by sale line items of a variant; `0` when unsold.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn sold_quantity_for_variant<'e, E>(executor: E, variant_id: i64) -> Result<i64, DbError>
where
    E: PgExecutor<'e>,
{
    let sold = sqlx::query_scalar::<_, i64>(
        "SELECT COALESCE(SUM(quantity), 0)::bigint FROM sale_line_items WHERE variant_id = $1",
    )
    .bind(variant_id)
    .fetch_one(executor)
    .await?;
    Ok(sold)
}

// ---------------------------------------------------------------------------
// variants operations
// ---------------------------------------------------------------------------

/// Inserts a variant row and returns it.
///
/// `stock_quantity` is the total of the size breakdown inserted alongside.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including foreign key
/// violations on `product_id` / `color_id`).
pub async fn insert_variant(
    conn: &mut PgConnection,
    product_id: i64,
    color_id: i64,
    price: Option<Decimal>,
    status: &str,
    stock_quantity: i32,
) -> Result<VariantRow, DbError> {
    let row = sqlx::query_as::<_, VariantRow>(&format!(
        "INSERT INTO variants (product_id, color_id, price, status, stock_quantity) \
         VALUES ($1, $2, $3::numeric(10,2), $4, $5) \
         RETURNING {VARIANT_COLUMNS}"
    ))
    .bind(product_id)
    .bind(color_id)
    .bind(price)
    .bind(status)
    .bind(stock_quantity)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

/// Fetches a variant row with `FOR UPDATE`, serializing concurrent writers
/// on the same variant until the surrounding transaction ends.
///
/// Returns `None` if the variant does not exist.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn lock_variant(
    conn: &mut PgConnection,
    id: i64,
) -> Result<Option<VariantRow>, DbError> {
    let row = sqlx::query_as::<_, VariantRow>(&format!(
        "SELECT {VARIANT_COLUMNS} FROM variants WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(row)
}

/// Writes the full set of mutable variant columns.
///
/// Callers merge partial input with the locked row before calling, so every
/// column is written explicitly.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row has `id`, or [`DbError::Sqlx`]
/// if the update fails.
pub async fn update_variant(
    conn: &mut PgConnection,
    id: i64,
    color_id: i64,
    price: Option<Decimal>,
    status: &str,
) -> Result<VariantRow, DbError> {
    let row = sqlx::query_as::<_, VariantRow>(&format!(
        "UPDATE variants \
         SET color_id = $2, price = $3::numeric(10,2), status = $4, updated_at = NOW() \
         WHERE id = $1 \
         RETURNING {VARIANT_COLUMNS}"
    ))
    .bind(id)
    .bind(color_id)
    .bind(price)
    .bind(status)
    .fetch_optional(conn)
    .await?;
    row.ok_or(DbError::NotFound)
}

/// Deletes the variant row. Size and image rows must already be gone or are
/// removed by `ON DELETE CASCADE`.
///
/// Returns `true` if a row was deleted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_variant(conn: &mut PgConnection, id: i64) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM variants WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Returns one variant joined with product and color names.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_variant_detail<'e, E>(
    executor: E,
    id: i64,
) -> Result<Option<VariantDetailRow>, DbError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, VariantDetailRow>(&format!("{DETAIL_SELECT} WHERE v.id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(row)
}

/// Lists every variant, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_variant_details<'e, E>(executor: E) -> Result<Vec<VariantDetailRow>, DbError>
where
    E: PgExecutor<'e>,
{
    let rows =
        sqlx::query_as::<_, VariantDetailRow>(&format!("{DETAIL_SELECT} ORDER BY v.id DESC"))
            .fetch_all(executor)
            .await?;
    Ok(rows)
}

/// Lists the variants of one product, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_variant_details_by_product<'e, E>(
    executor: E,
    product_id: i64,
) -> Result<Vec<VariantDetailRow>, DbError>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query_as::<_, VariantDetailRow>(&format!(
        "{DETAIL_SELECT} WHERE v.product_id = $1 ORDER BY v.id"
    ))
    .bind(product_id)
    .fetch_all(executor)
    .await?;
    Ok(rows)
}
