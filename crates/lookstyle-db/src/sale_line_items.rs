//! Database operations for `sale_line_items`.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgExecutor};

use crate::DbError;

/// A row from the `sale_line_items` table.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct LineItemRow {
    pub id: i64,
    pub sale_id: i64,
    pub variant_id: i64,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

/// A line item joined with the sold variant's product and color names.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct LineItemDetailRow {
    pub id: i64,
    pub sale_id: i64,
    pub variant_id: i64,
    pub product_name: String,
    pub color_name: String,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

const LINE_ITEM_COLUMNS: &str = "id, sale_id, variant_id, quantity, created_at";

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_line_item(
    conn: &mut PgConnection,
    sale_id: i64,
    variant_id: i64,
    quantity: i32,
) -> Result<LineItemRow, DbError> {
    let row = sqlx::query_as::<_, LineItemRow>(&format!(
        "INSERT INTO sale_line_items (sale_id, variant_id, quantity) \
         VALUES ($1, $2, $3) \
         RETURNING {LINE_ITEM_COLUMNS}"
    ))
    .bind(sale_id)
    .bind(variant_id)
    .bind(quantity)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

/// Fetches a line item with `FOR UPDATE`, so its stored quantity cannot move
/// while the caller adjusts stock against it.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn lock_line_item(
    conn: &mut PgConnection,
    id: i64,
) -> Result<Option<LineItemRow>, DbError> {
    let row = sqlx::query_as::<_, LineItemRow>(&format!(
        "SELECT {LINE_ITEM_COLUMNS} FROM sale_line_items WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(row)
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if no row has `id`, or [`DbError::Sqlx`]
/// if the update fails.
pub async fn update_line_item(
    conn: &mut PgConnection,
    id: i64,
    variant_id: i64,
    quantity: i32,
) -> Result<LineItemRow, DbError> {
    let row = sqlx::query_as::<_, LineItemRow>(&format!(
        "UPDATE sale_line_items SET variant_id = $2, quantity = $3 \
         WHERE id = $1 \
         RETURNING {LINE_ITEM_COLUMNS}"
    ))
    .bind(id)
    .bind(variant_id)
    .bind(quantity)
    .fetch_optional(conn)
    .await?;
    row.ok_or(DbError::NotFound)
}

/// Returns `true` if a row was deleted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_line_item(conn: &mut PgConnection, id: i64) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM sale_line_items WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Lists the line items of a sale with product and color names, in insertion
/// order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_line_items_for_sale<'e, E>(
    executor: E,
    sale_id: i64,
) -> Result<Vec<LineItemDetailRow>, DbError>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query_as::<_, LineItemDetailRow>(
        "SELECT li.id, li.sale_id, li.variant_id, p.name AS product_name, \
                c.name AS color_name, li.quantity, li.created_at \
         FROM sale_line_items li \
         JOIN variants v ON v.id = li.variant_id \
         JOIN products p ON p.id = v.product_id \
         JOIN colors c ON c.id = v.color_id \
         WHERE li.sale_id = $1 \
         ORDER BY li.id",
    )
    .bind(sale_id)
    .fetch_all(executor)
    .await?;
    Ok(rows)
}

/// Locks every line item of a sale with `FOR UPDATE`, ordered by variant id
/// so stock restoration touches variants in a stable order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn lock_line_items_for_sale(
    conn: &mut PgConnection,
    sale_id: i64,
) -> Result<Vec<LineItemRow>, DbError> {
    let rows = sqlx::query_as::<_, LineItemRow>(&format!(
        "SELECT {LINE_ITEM_COLUMNS} FROM sale_line_items \
         WHERE sale_id = $1 \
         ORDER BY variant_id, id \
         FOR UPDATE"
    ))
    .bind(sale_id)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

/// Deletes every line item of a sale and returns how many were removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_line_items_for_sale(
    conn: &mut PgConnection,
    sale_id: i64,
) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM sale_line_items WHERE sale_id = $1")
        .bind(sale_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}
