//! Variant, stock and sale orchestration on top of `lookstyle-db` and an
//! [`ImageStore`](lookstyle_images::ImageStore).
//!
//! Every mutating operation runs in one database transaction. External image
//! deletions happen after commit and report failures as [`CleanupWarning`]s
//! on a [`Reconciled`] result instead of failing the operation.

pub mod error;
pub mod ledger;
pub mod line_items;
pub mod reconcile;
pub mod sales;
pub mod variants;

pub use error::{CatalogError, ErrorKind};
pub use ledger::{plan_line_item_change, plan_restock, Holding, StockAdjustment};
pub use line_items::{LineItem, LineItemDetail, LineItemManager};
pub use reconcile::{CleanupWarning, Reconciled};
pub use sales::{Sale, SaleManager};
pub use variants::{ImageView, SizeView, VariantManager, VariantView};
