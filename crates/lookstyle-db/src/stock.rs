//! Aggregate stock on `variants.stock_quantity`.
//!
//! Every decrement goes through a single conditional `UPDATE`, so two
//! concurrent sales of the same variant can never both succeed past the
//! available quantity.

use sqlx::{PgConnection, PgExecutor};

use crate::DbError;

/// Subtracts `delta` from a variant's stock if the result stays non-negative.
///
/// A negative `delta` returns stock. Returns the new quantity, or `None` if
/// the variant does not exist or holds fewer than `delta` units; callers use
/// [`get_stock_quantity`] to tell the two apart.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn adjust_stock_if_available(
    conn: &mut PgConnection,
    variant_id: i64,
    delta: i32,
) -> Result<Option<i32>, DbError> {
    let remaining = sqlx::query_scalar::<_, i32>(
        "UPDATE variants \
         SET stock_quantity = stock_quantity - $2, updated_at = NOW() \
         WHERE id = $1 AND stock_quantity - $2 >= 0 \
         RETURNING stock_quantity",
    )
    .bind(variant_id)
    .bind(delta)
    .fetch_optional(conn)
    .await?;
    Ok(remaining)
}

/// Returns a variant's current aggregate stock, or `None` if it does not exist.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_stock_quantity<'e, E>(
    executor: E,
    variant_id: i64,
) -> Result<Option<i32>, DbError>
where
    E: PgExecutor<'e>,
{
    let quantity =
        sqlx::query_scalar::<_, i32>("SELECT stock_quantity FROM variants WHERE id = $1")
            .bind(variant_id)
            .fetch_optional(executor)
            .await?;
    Ok(quantity)
}

/// Overwrites a variant's aggregate stock. Used when the size breakdown is
/// replaced; the caller locks the variant row and subtracts units already
/// sold before writing.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the variant does not exist, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn set_stock_quantity(
    conn: &mut PgConnection,
    variant_id: i64,
    quantity: i32,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE variants SET stock_quantity = $2, updated_at = NOW() WHERE id = $1",
    )
    .bind(variant_id)
    .bind(quantity)
    .execute(conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}
