//! Application services over a [`LedgerStore`].
//!
//! Each service is generic over the store so tests run against
//! `InMemoryLedgerStore` and production against `PostgresLedgerStore`
//! without code changes.

pub mod allocator;
pub mod analytics;
pub mod stock_ledger;
pub mod tool_lifecycle;

use fieldstock_core::DomainError;
use thiserror::Error;

use crate::store::StoreError;

pub use allocator::{JobMaterialAllocator, JobMaterialWithMaterial};
pub use analytics::{InventoryAnalytics, ToolUtilization, ToolUtilizationReport};
pub use stock_ledger::StockLedger;
pub use tool_lifecycle::ToolLifecycleManager;

/// Unified error for the service layer: a domain rule rejection or a
/// storage failure.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    /// Whether a retry of the same call could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::Store(e) if e.is_transient())
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
