//! Stock ledger rules.
//!
//! A line item holds `quantity` units of one variant. Every change to a line
//! item is turned into signed [`StockAdjustment`]s against
//! `variants.stock_quantity` (positive `delta` takes stock, negative returns
//! it), applied in the same transaction as the line-item write. Adjustments
//! go through the conditional update in `lookstyle_db::adjust_stock_if_available`,
//! so available stock never drops below zero even under concurrent sales.

use std::collections::BTreeMap;

use lookstyle_db::{adjust_stock_if_available, get_stock_quantity};
use sqlx::PgConnection;

use crate::CatalogError;

/// Units of one variant committed by a line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Holding {
    pub variant_id: i64,
    pub quantity: i32,
}

/// Signed change to one variant's available stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockAdjustment {
    pub variant_id: i64,
    pub delta: i32,
}

/// Plans the stock movement for a line item going from `before` to `after`.
///
/// `None` on the left is a create, `None` on the right a delete. Moving a
/// line item to another variant returns the full old quantity and takes the
/// full new quantity. The result is ordered by variant id and contains no
/// zero deltas.
#[must_use]
pub fn plan_line_item_change(
    before: Option<Holding>,
    after: Option<Holding>,
) -> Vec<StockAdjustment> {
    let mut deltas: BTreeMap<i64, i32> = BTreeMap::new();
    if let Some(old) = before {
        *deltas.entry(old.variant_id).or_default() -= old.quantity;
    }
    if let Some(new) = after {
        *deltas.entry(new.variant_id).or_default() += new.quantity;
    }
    deltas
        .into_iter()
        .filter(|(_, delta)| *delta != 0)
        .map(|(variant_id, delta)| StockAdjustment { variant_id, delta })
        .collect()
}

/// Plans returning every holding to stock, one adjustment per variant,
/// ordered by variant id.
///
/// # Errors
///
/// Returns [`CatalogError::Validation`] if the units returned to one variant
/// do not fit in the stock range.
pub fn plan_restock(holdings: &[Holding]) -> Result<Vec<StockAdjustment>, CatalogError> {
    let mut totals: BTreeMap<i64, i32> = BTreeMap::new();
    for holding in holdings {
        let total = totals.entry(holding.variant_id).or_default();
        *total = total.checked_add(holding.quantity).ok_or_else(|| {
            CatalogError::Validation(format!(
                "restocked quantity for variant {} exceeds the supported range",
                holding.variant_id
            ))
        })?;
    }
    Ok(totals
        .into_iter()
        .filter(|(_, total)| *total != 0)
        .map(|(variant_id, total)| StockAdjustment {
            variant_id,
            delta: -total,
        })
        .collect())
}

/// Applies planned adjustments in order. The first one that would drive
/// stock negative aborts with [`CatalogError::InsufficientStock`]; the caller
/// rolls the transaction back.
///
/// # Errors
///
/// - [`CatalogError::InsufficientStock`] if a variant holds fewer units than requested.
/// - [`CatalogError::NotFound`] if a variant no longer exists.
/// - [`CatalogError::Storage`] on database failure.
pub async fn apply(
    conn: &mut PgConnection,
    adjustments: &[StockAdjustment],
) -> Result<(), CatalogError> {
    for adjustment in adjustments {
        let StockAdjustment { variant_id, delta } = *adjustment;
        if let Some(remaining) = adjust_stock_if_available(&mut *conn, variant_id, delta).await? {
            tracing::debug!(variant_id, delta, remaining, "stock adjusted");
            continue;
        }

        return Err(match get_stock_quantity(&mut *conn, variant_id).await? {
            Some(available) => {
                tracing::info!(variant_id, requested = delta, available, "insufficient stock");
                CatalogError::InsufficientStock {
                    variant_id,
                    requested: delta,
                    available,
                }
            }
            None => CatalogError::not_found("variant", variant_id),
        });
    }
    Ok(())
}
