//! Database operations for `sales` headers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgExecutor};

use crate::DbError;

/// A row from the `sales` table.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct SaleRow {
    pub id: i64,
    pub user_id: i64,
    pub sold_at: DateTime<Utc>,
    pub total: Decimal,
}

const SALE_COLUMNS: &str = "id, user_id, sold_at, total";

/// Inserts a sale header stamped with the current time.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_sale<'e, E>(
    executor: E,
    user_id: i64,
    total: Decimal,
) -> Result<SaleRow, DbError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, SaleRow>(&format!(
        "INSERT INTO sales (user_id, total) VALUES ($1, $2::numeric(12,2)) \
         RETURNING {SALE_COLUMNS}"
    ))
    .bind(user_id)
    .bind(total)
    .fetch_one(executor)
    .await?;
    Ok(row)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_sale<'e, E>(executor: E, id: i64) -> Result<Option<SaleRow>, DbError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, SaleRow>(&format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(row)
}

/// Fetches a sale header with `FOR UPDATE`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn lock_sale(conn: &mut PgConnection, id: i64) -> Result<Option<SaleRow>, DbError> {
    let row = sqlx::query_as::<_, SaleRow>(&format!(
        "SELECT {SALE_COLUMNS} FROM sales WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(row)
}

/// Lists every sale, most recent first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_sales<'e, E>(executor: E) -> Result<Vec<SaleRow>, DbError>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query_as::<_, SaleRow>(&format!(
        "SELECT {SALE_COLUMNS} FROM sales ORDER BY sold_at DESC, id DESC"
    ))
    .fetch_all(executor)
    .await?;
    Ok(rows)
}

/// Writes every mutable column of a sale header.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row has `id`, or [`DbError::Sqlx`]
/// if the update fails.
pub async fn update_sale(
    conn: &mut PgConnection,
    id: i64,
    user_id: i64,
    total: Decimal,
    sold_at: DateTime<Utc>,
) -> Result<SaleRow, DbError> {
    let row = sqlx::query_as::<_, SaleRow>(&format!(
        "UPDATE sales SET user_id = $2, total = $3::numeric(12,2), sold_at = $4 \
         WHERE id = $1 \
         RETURNING {SALE_COLUMNS}"
    ))
    .bind(id)
    .bind(user_id)
    .bind(total)
    .bind(sold_at)
    .fetch_optional(conn)
    .await?;
    row.ok_or(DbError::NotFound)
}

/// Deletes a sale header. Its line items must already be gone.
///
/// Returns `true` if a row was deleted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_sale(conn: &mut PgConnection, id: i64) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM sales WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}
