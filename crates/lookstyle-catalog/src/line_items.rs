//! Sale line items. Every write is paired with its stock adjustment in the
//! same transaction.

use chrono::{DateTime, Utc};
use lookstyle_core::{LineItemChanges, NewLineItem};
use lookstyle_db::{
    delete_line_item, get_sale, get_stock_quantity, insert_line_item, lock_line_item,
    update_line_item, LineItemDetailRow, LineItemRow,
};
use serde::Serialize;
use sqlx::{PgConnection, PgPool};

use crate::ledger::{self, plan_line_item_change, Holding};
use crate::CatalogError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineItem {
    pub id: i64,
    pub sale_id: i64,
    pub variant_id: i64,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

impl From<LineItemRow> for LineItem {
    fn from(row: LineItemRow) -> Self {
        Self {
            id: row.id,
            sale_id: row.sale_id,
            variant_id: row.variant_id,
            quantity: row.quantity,
            created_at: row.created_at,
        }
    }
}

impl LineItem {
    fn holding(&self) -> Holding {
        Holding {
            variant_id: self.variant_id,
            quantity: self.quantity,
        }
    }
}

/// A line item with the sold variant's product and color names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineItemDetail {
    pub id: i64,
    pub sale_id: i64,
    pub variant_id: i64,
    pub product_name: String,
    pub color_name: String,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

impl From<LineItemDetailRow> for LineItemDetail {
    fn from(row: LineItemDetailRow) -> Self {
        Self {
            id: row.id,
            sale_id: row.sale_id,
            variant_id: row.variant_id,
            product_name: row.product_name,
            color_name: row.color_name,
            quantity: row.quantity,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LineItemManager {
    pool: PgPool,
}

impl LineItemManager {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Records `quantity` units of a variant on a sale and takes them from
    /// stock.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::Validation`] for a non-positive quantity or an unknown sale or variant.
    /// - [`CatalogError::InsufficientStock`] if the variant holds fewer units.
    /// - [`CatalogError::Storage`] on database failure.
    pub async fn create(&self, input: NewLineItem) -> Result<LineItem, CatalogError> {
        input.validate()?;

        let mut tx = self.pool.begin().await?;
        if get_sale(&mut *tx, input.sale_id).await?.is_none() {
            return Err(CatalogError::Validation(format!(
                "sale {} does not exist",
                input.sale_id
            )));
        }
        ensure_variant(&mut tx, input.variant_id).await?;

        let plan = plan_line_item_change(
            None,
            Some(Holding {
                variant_id: input.variant_id,
                quantity: input.quantity,
            }),
        );
        ledger::apply(&mut tx, &plan).await?;
        let row = insert_line_item(&mut tx, input.sale_id, input.variant_id, input.quantity).await?;
        tx.commit().await?;

        tracing::info!(
            line_item_id = row.id,
            sale_id = row.sale_id,
            variant_id = row.variant_id,
            quantity = row.quantity,
            "line item created"
        );
        Ok(row.into())
    }

    /// Changes the variant and/or quantity of a line item. A variant change
    /// returns the full old quantity to the old variant and takes the full
    /// new quantity from the new one.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::NotFound`] if the line item does not exist.
    /// - [`CatalogError::Validation`] for a non-positive quantity or an unknown variant.
    /// - [`CatalogError::InsufficientStock`] if the target variant holds fewer units.
    /// - [`CatalogError::Storage`] on database failure.
    pub async fn update(
        &self,
        id: i64,
        changes: LineItemChanges,
    ) -> Result<LineItem, CatalogError> {
        changes.validate()?;

        let mut tx = self.pool.begin().await?;
        let current: LineItem = lock_line_item(&mut tx, id)
            .await?
            .ok_or_else(|| CatalogError::not_found("line item", id))?
            .into();

        let target = Holding {
            variant_id: changes.variant_id.unwrap_or(current.variant_id),
            quantity: changes.quantity.unwrap_or(current.quantity),
        };
        if target == current.holding() {
            return Ok(current);
        }
        if target.variant_id != current.variant_id {
            ensure_variant(&mut tx, target.variant_id).await?;
        }

        let plan = plan_line_item_change(Some(current.holding()), Some(target));
        ledger::apply(&mut tx, &plan).await?;
        let row = update_line_item(&mut tx, id, target.variant_id, target.quantity).await?;
        tx.commit().await?;

        tracing::info!(
            line_item_id = id,
            from_variant = current.variant_id,
            to_variant = row.variant_id,
            from_quantity = current.quantity,
            to_quantity = row.quantity,
            "line item updated"
        );
        Ok(row.into())
    }

    /// Deletes a line item and returns its units to stock. Returns the
    /// deleted line item.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::NotFound`] if the line item does not exist.
    /// - [`CatalogError::Storage`] on database failure.
    pub async fn delete(&self, id: i64) -> Result<LineItem, CatalogError> {
        let mut tx = self.pool.begin().await?;
        let current: LineItem = lock_line_item(&mut tx, id)
            .await?
            .ok_or_else(|| CatalogError::not_found("line item", id))?
            .into();

        let plan = plan_line_item_change(Some(current.holding()), None);
        ledger::apply(&mut tx, &plan).await?;
        delete_line_item(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!(
            line_item_id = id,
            variant_id = current.variant_id,
            restored = current.quantity,
            "line item deleted"
        );
        Ok(current)
    }
}

async fn ensure_variant(conn: &mut PgConnection, variant_id: i64) -> Result<(), CatalogError> {
    if get_stock_quantity(&mut *conn, variant_id).await?.is_some() {
        Ok(())
    } else {
        Err(CatalogError::Validation(format!("variant {variant_id} does not exist")))
    }
}
