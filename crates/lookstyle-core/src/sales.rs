use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Input for recording a sale header. The timestamp is assigned on insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSale {
    pub user_id: i64,
    pub total: Decimal,
}

impl NewSale {
    /// # Errors
    ///
    /// Returns [`CoreError::NegativeAmount`] if `total` is below zero.
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_total(self.total)
    }
}

/// Partial update for a sale header. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleChanges {
    pub user_id: Option<i64>,
    pub total: Option<Decimal>,
    pub sold_at: Option<DateTime<Utc>>,
}

impl SaleChanges {
    /// # Errors
    ///
    /// Returns [`CoreError::NegativeAmount`] if `total` is below zero.
    pub fn validate(&self) -> Result<(), CoreError> {
        self.total.map_or(Ok(()), validate_total)
    }
}

/// Input for adding one variant to a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLineItem {
    pub sale_id: i64,
    pub variant_id: i64,
    pub quantity: i32,
}

impl NewLineItem {
    /// # Errors
    ///
    /// Returns [`CoreError::NonPositiveQuantity`] if `quantity <= 0`.
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_sold_quantity(self.quantity)
    }
}

/// Partial update for a line item. `None` keeps the stored value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemChanges {
    pub variant_id: Option<i64>,
    pub quantity: Option<i32>,
}

impl LineItemChanges {
    /// # Errors
    ///
    /// Returns [`CoreError::NonPositiveQuantity`] if a supplied `quantity <= 0`.
    pub fn validate(&self) -> Result<(), CoreError> {
        self.quantity.map_or(Ok(()), validate_sold_quantity)
    }
}

fn validate_sold_quantity(quantity: i32) -> Result<(), CoreError> {
    if quantity <= 0 {
        return Err(CoreError::NonPositiveQuantity(quantity));
    }
    Ok(())
}

fn validate_total(total: Decimal) -> Result<(), CoreError> {
    if total < Decimal::ZERO {
        return Err(CoreError::NegativeAmount {
            field: "total",
            value: total,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_item_quantity_must_be_positive() {
        let item = NewLineItem {
            sale_id: 1,
            variant_id: 1,
            quantity: 0,
        };
        assert_eq!(item.validate(), Err(CoreError::NonPositiveQuantity(0)));

        let item = NewLineItem { quantity: 3, ..item };
        assert!(item.validate().is_ok());
    }

    #[test]
    fn line_item_changes_only_check_supplied_quantity() {
        assert!(LineItemChanges::default().validate().is_ok());
        let changes = LineItemChanges {
            variant_id: None,
            quantity: Some(-2),
        };
        assert_eq!(changes.validate(), Err(CoreError::NonPositiveQuantity(-2)));
    }

    #[test]
    fn sale_total_must_not_be_negative() {
        let sale = NewSale {
            user_id: 9,
            total: Decimal::new(-100, 2),
        };
        assert!(matches!(
            sale.validate(),
            Err(CoreError::NegativeAmount { field: "total", .. })
        ));
        assert!(SaleChanges {
            total: Some(Decimal::ZERO),
            ..SaleChanges::default()
        }
        .validate()
        .is_ok());
    }
}
