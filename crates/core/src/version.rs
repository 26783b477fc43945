//! Optimistic concurrency primitives for conditional row updates.

use crate::error::{DomainError, DomainResult};

/// Version expectation for a conditional write.
///
/// Every mutable row carries a monotonically increasing version. Writers read
/// the row, decide, and write back with `Exact(read_version)`; a concurrent
/// writer that got there first makes the expectation fail instead of silently
/// clobbering the balance or status.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Skip version checking (useful for idempotent writes, migrations, etc.).
    Any,
    /// Require the row to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }

    pub fn check(self, actual: u64) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "optimistic concurrency check failed (expected: {self:?}, actual: {actual})"
            )))
        }
    }
}
