//! Sale headers. Deleting a sale returns the stock of all its line items.

use chrono::{DateTime, Utc};
use lookstyle_core::{NewSale, SaleChanges};
use lookstyle_db::{
    delete_line_items_for_sale, delete_sale, get_sale, insert_sale, list_line_items_for_sale,
    list_sales, lock_line_items_for_sale, lock_sale, update_sale, SaleRow,
};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use crate::ledger::{self, plan_restock, Holding};
use crate::{CatalogError, LineItemDetail};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sale {
    pub id: i64,
    pub user_id: i64,
    pub sold_at: DateTime<Utc>,
    pub total: Decimal,
}

impl From<SaleRow> for Sale {
    fn from(row: SaleRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            sold_at: row.sold_at,
            total: row.total,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SaleManager {
    pool: PgPool,
}

impl SaleManager {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns [`CatalogError::Validation`] for a negative total, or
    /// [`CatalogError::Storage`] on database failure.
    pub async fn create(&self, input: NewSale) -> Result<Sale, CatalogError> {
        input.validate()?;
        let row = insert_sale(&self.pool, input.user_id, input.total).await?;
        tracing::info!(sale_id = row.id, user_id = row.user_id, "sale created");
        Ok(row.into())
    }

    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] if the sale does not exist, or
    /// [`CatalogError::Storage`] on database failure.
    pub async fn get(&self, id: i64) -> Result<Sale, CatalogError> {
        get_sale(&self.pool, id)
            .await?
            .map(Sale::from)
            .ok_or_else(|| CatalogError::not_found("sale", id))
    }

    /// Every sale, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Storage`] on database failure.
    pub async fn list(&self) -> Result<Vec<Sale>, CatalogError> {
        let rows = list_sales(&self.pool).await?;
        Ok(rows.into_iter().map(Sale::from).collect())
    }

    /// # Errors
    ///
    /// - [`CatalogError::NotFound`] if the sale does not exist.
    /// - [`CatalogError::Validation`] for a negative total.
    /// - [`CatalogError::Storage`] on database failure.
    pub async fn update(&self, id: i64, changes: SaleChanges) -> Result<Sale, CatalogError> {
        changes.validate()?;

        let mut tx = self.pool.begin().await?;
        let current = lock_sale(&mut tx, id)
            .await?
            .ok_or_else(|| CatalogError::not_found("sale", id))?;

        let row = update_sale(
            &mut tx,
            id,
            changes.user_id.unwrap_or(current.user_id),
            changes.total.unwrap_or(current.total),
            changes.sold_at.unwrap_or(current.sold_at),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(sale_id = id, "sale updated");
        Ok(row.into())
    }

    /// Deletes a sale and its line items, returning every sold unit to
    /// stock. Returns the number of line items removed.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::NotFound`] if the sale does not exist.
    /// - [`CatalogError::Storage`] on database failure.
    pub async fn delete(&self, id: i64) -> Result<u64, CatalogError> {
        let mut tx = self.pool.begin().await?;
        lock_sale(&mut tx, id)
            .await?
            .ok_or_else(|| CatalogError::not_found("sale", id))?;

        let items = lock_line_items_for_sale(&mut tx, id).await?;
        let holdings: Vec<Holding> = items
            .iter()
            .map(|item| Holding {
                variant_id: item.variant_id,
                quantity: item.quantity,
            })
            .collect();
        ledger::apply(&mut tx, &plan_restock(&holdings)?).await?;

        let removed = delete_line_items_for_sale(&mut tx, id).await?;
        delete_sale(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!(sale_id = id, line_items = removed, "sale deleted");
        Ok(removed)
    }

    /// Line items of a sale with product and color names.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] if the sale does not exist, or
    /// [`CatalogError::Storage`] on database failure.
    pub async fn list_line_items(&self, sale_id: i64) -> Result<Vec<LineItemDetail>, CatalogError> {
        if get_sale(&self.pool, sale_id).await?.is_none() {
            return Err(CatalogError::not_found("sale", sale_id));
        }
        let rows = list_line_items_for_sale(&self.pool, sale_id).await?;
        Ok(rows.into_iter().map(LineItemDetail::from).collect())
    }
}
