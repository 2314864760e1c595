//! Database operations for `variant_sizes`, the per-size stock breakdown.

use lookstyle_core::SizeQuantity;
use sqlx::{PgConnection, PgExecutor};

use crate::DbError;

/// A `variant_sizes` row joined with the size name.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct VariantSizeRow {
    pub variant_id: i64,
    pub size_id: i64,
    pub size_name: String,
    pub quantity: i32,
}

/// Replaces the whole size breakdown of a variant: every existing row is
/// deleted, then one row per entry is inserted.
///
/// Run inside the caller's transaction so the breakdown is never observed
/// half-replaced.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails.
pub async fn replace_variant_sizes(
    conn: &mut PgConnection,
    variant_id: i64,
    sizes: &[SizeQuantity],
) -> Result<(), DbError> {
    delete_variant_sizes(&mut *conn, variant_id).await?;

    for entry in sizes {
        sqlx::query(
            "INSERT INTO variant_sizes (variant_id, size_id, quantity) \
             VALUES ($1, $2, $3)",
        )
        .bind(variant_id)
        .bind(entry.size_id)
        .bind(entry.quantity)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Deletes every size row of a variant and returns how many were removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_variant_sizes<'e, E>(executor: E, variant_id: i64) -> Result<u64, DbError>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM variant_sizes WHERE variant_id = $1")
        .bind(variant_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

/// Lists the size breakdown of a variant ordered by size id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_variant_sizes<'e, E>(
    executor: E,
    variant_id: i64,
) -> Result<Vec<VariantSizeRow>, DbError>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query_as::<_, VariantSizeRow>(
        "SELECT vs.variant_id, vs.size_id, s.name AS size_name, vs.quantity \
         FROM variant_sizes vs \
         JOIN sizes s ON s.id = vs.size_id \
         WHERE vs.variant_id = $1 \
         ORDER BY vs.size_id",
    )
    .bind(variant_id)
    .fetch_all(executor)
    .await?;
    Ok(rows)
}
