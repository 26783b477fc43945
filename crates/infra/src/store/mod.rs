//! Transactional row store boundary.
//!
//! This module defines an infrastructure-facing abstraction over the six row
//! families the ledger owns (materials, transactions, job materials, tool
//! assignments, maintenance events, job tools) without making any storage
//! assumptions.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryLedgerStore;
pub use postgres::PostgresLedgerStore;
pub use r#trait::{LedgerStore, StoreError};
