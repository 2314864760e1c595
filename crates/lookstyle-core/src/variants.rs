use std::collections::HashSet;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::CoreError;

/// Sale status of a variant.
///
/// `active` and `inactive` are the statuses the storefront filters on; any
/// other non-empty label is kept, lowercased. The legacy Spanish labels
/// (`Activo`, `Inactivo`) are accepted and normalized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum VariantStatus {
    #[default]
    Active,
    Inactive,
    Other(String),
}

impl VariantStatus {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            VariantStatus::Active => "active",
            VariantStatus::Inactive => "inactive",
            VariantStatus::Other(label) => label,
        }
    }
}

impl std::fmt::Display for VariantStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VariantStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(CoreError::EmptyStatus);
        }
        match trimmed.to_lowercase().as_str() {
            "active" | "activo" => Ok(VariantStatus::Active),
            "inactive" | "inactivo" => Ok(VariantStatus::Inactive),
            other => Ok(VariantStatus::Other(other.to_string())),
        }
    }
}

impl TryFrom<String> for VariantStatus {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VariantStatus> for String {
    fn from(status: VariantStatus) -> Self {
        status.as_str().to_string()
    }
}

/// Stock count for one size of a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeQuantity {
    pub size_id: i64,
    pub quantity: i32,
}

impl SizeQuantity {
    #[must_use]
    pub fn new(size_id: i64, quantity: i32) -> Self {
        Self { size_id, quantity }
    }
}

/// Input for creating a variant.
///
/// `price: None` means the variant sells at its product's base price.
/// `status: None` defaults to [`VariantStatus::Active`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVariant {
    pub product_id: i64,
    pub color_id: i64,
    pub price: Option<Decimal>,
    pub status: Option<VariantStatus>,
    #[serde(default)]
    pub sizes: Vec<SizeQuantity>,
}

impl NewVariant {
    /// Checks the shape of the input. Reference checks (product, color, size
    /// ids) need the database and happen inside the create transaction.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError`] for a negative price or a malformed size breakdown.
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_price(self.price)?;
        validate_sizes(&self.sizes)
    }

    #[must_use]
    pub fn status_or_default(&self) -> VariantStatus {
        self.status.clone().unwrap_or_default()
    }
}

/// Partial update for a variant. `None` keeps the stored value.
///
/// `price` distinguishes "not in request" (`None`) from "explicitly cleared
/// back to the product base price" (`Some(None)`).
/// `sizes`, when present, replaces the whole breakdown.
#[allow(clippy::option_option)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantChanges {
    pub color_id: Option<i64>,
    #[serde(default, deserialize_with = "present")]
    pub price: Option<Option<Decimal>>,
    pub status: Option<VariantStatus>,
    pub sizes: Option<Vec<SizeQuantity>>,
}

/// Maps a key that is present in the input to `Some`, even when its value is
/// `null`; absent keys fall back to `None` through `#[serde(default)]`.
fn present<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl VariantChanges {
    /// # Errors
    ///
    /// Returns [`CoreError`] for a negative price or a malformed size breakdown.
    pub fn validate(&self) -> Result<(), CoreError> {
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        if let Some(sizes) = &self.sizes {
            validate_sizes(sizes)?;
        }
        Ok(())
    }

    /// Returns `true` when at least one column of the variant row changes.
    #[must_use]
    pub fn touches_row(&self) -> bool {
        self.color_id.is_some() || self.price.is_some() || self.status.is_some()
    }
}

/// Validates a size breakdown: one entry per size, no negative quantities.
///
/// Duplicate size ids are rejected rather than merged so the stored breakdown
/// always matches the request exactly.
///
/// # Errors
///
/// Returns [`CoreError::DuplicateSize`], [`CoreError::NegativeSizeQuantity`],
/// or [`CoreError::QuantityOverflow`].
pub fn validate_sizes(sizes: &[SizeQuantity]) -> Result<(), CoreError> {
    let mut seen = HashSet::new();
    for entry in sizes {
        if entry.quantity < 0 {
            return Err(CoreError::NegativeSizeQuantity {
                size_id: entry.size_id,
                quantity: entry.quantity,
            });
        }
        if !seen.insert(entry.size_id) {
            return Err(CoreError::DuplicateSize(entry.size_id));
        }
    }
    total_quantity(sizes)?;
    Ok(())
}

/// Sum of a size breakdown, used as the variant's aggregate stock.
///
/// # Errors
///
/// Returns [`CoreError::QuantityOverflow`] if the sum does not fit in `i32`.
pub fn total_quantity(sizes: &[SizeQuantity]) -> Result<i32, CoreError> {
    sizes.iter().try_fold(0i32, |acc, entry| {
        acc.checked_add(entry.quantity)
            .ok_or(CoreError::QuantityOverflow)
    })
}

fn validate_price(price: Option<Decimal>) -> Result<(), CoreError> {
    match price {
        Some(value) if value < Decimal::ZERO => {
            Err(CoreError::NegativeAmount {
                field: "price",
                value,
            })
        }
        _ => Ok(()),
    }
}
