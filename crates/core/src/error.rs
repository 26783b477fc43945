//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, conflicts). Infrastructure concerns belong elsewhere.
///
/// The variants are deliberately fine-grained: callers render different
/// messages for "tool not found", "not a tool", and "tool not available", so
/// those must stay distinguishable kinds rather than one generic failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A referenced entity was not found (domain-level).
    #[error("not found: {0}")]
    NotFound(String),

    /// A material is already allocated to the same job.
    #[error("duplicate allocation: {0}")]
    DuplicateAllocation(String),

    /// A tool is already assigned to the same job.
    #[error("duplicate assignment: {0}")]
    DuplicateAssignment(String),

    /// A deduction would drive the balance below what is on hand.
    #[error("insufficient stock: available {available}, requested {requested}")]
    InsufficientStock { available: i64, requested: i64 },

    /// An adjustment would leave the balance negative.
    #[error("adjustment would make stock negative: current {current}, delta {delta}")]
    NegativeStock { current: i64, delta: i64 },

    /// A tool is not in the state the checkout/checkin cycle requires.
    #[error("tool unavailable: {0}")]
    ToolUnavailable(String),

    /// The operation does not apply to this entity (e.g. not a tool).
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// A conflict occurred (e.g. stale version / optimistic concurrency).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn duplicate_allocation(msg: impl Into<String>) -> Self {
        Self::DuplicateAllocation(msg.into())
    }

    pub fn duplicate_assignment(msg: impl Into<String>) -> Self {
        Self::DuplicateAssignment(msg.into())
    }

    pub fn tool_unavailable(msg: impl Into<String>) -> Self {
        Self::ToolUnavailable(msg.into())
    }

    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}
