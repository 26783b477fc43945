//! Inventory domain module.
//!
//! This crate contains business rules for material stock: the `Material` row,
//! the append-only transaction ledger that audits every balance change, and
//! the alert/summary rollups. Implemented purely as deterministic domain
//! logic (no IO, no HTTP, no storage).

pub mod material;
pub mod summary;
pub mod transaction;

pub use material::{Material, MaterialPatch, NewMaterial, ToolStatus};
pub use summary::{
    classify_stock, summarize, AlertSeverity, CategorySummary, InventorySummary, StockAlert,
    StockAlertKind,
};
pub use transaction::{MaterialTransaction, TransactionType};
