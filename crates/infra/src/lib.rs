//! `fieldstock-infra`: storage backends and the ledger engine services.
//!
//! The `store` module is the transactional row store boundary (`LedgerStore`
//! trait with in-memory and Postgres implementations). The `engine` module is
//! the application layer: the stock ledger, job material allocator, tool
//! lifecycle manager, and analytics services that compose domain rules with
//! a store.

pub mod engine;
pub mod store;

pub use engine::{
    InventoryAnalytics, JobMaterialAllocator, JobMaterialWithMaterial, LedgerError, LedgerResult,
    StockLedger, ToolLifecycleManager, ToolUtilization, ToolUtilizationReport,
};
pub use store::{InMemoryLedgerStore, LedgerStore, PostgresLedgerStore, StoreError};
