pub mod app_config;
pub mod config;
pub mod sales;
pub mod variants;

use rust_decimal::Decimal;
use thiserror::Error;

pub use app_config::{AppConfig, Environment, ImageStoreConfig};
pub use config::{load_app_config, load_app_config_from_env};
pub use sales::{LineItemChanges, NewLineItem, NewSale, SaleChanges};
pub use variants::{
    total_quantity, validate_sizes, NewVariant, SizeQuantity, VariantChanges, VariantStatus,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

/// Input validation failures detected before any database work starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("variant status must be non-empty")]
    EmptyStatus,

    #[error("size {0} appears more than once in the size breakdown")]
    DuplicateSize(i64),

    #[error("size {size_id} has negative quantity {quantity}")]
    NegativeSizeQuantity { size_id: i64, quantity: i32 },

    #[error("size breakdown total exceeds the supported stock range")]
    QuantityOverflow,

    #[error("{field} must not be negative, got {value}")]
    NegativeAmount { field: &'static str, value: Decimal },

    #[error("quantity must be greater than zero, got {0}")]
    NonPositiveQuantity(i32),
}
