use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use fieldstock_core::DomainError;
use fieldstock_infra::{LedgerError, StoreError};

/// Map a service error to an HTTP response.
///
/// Domain rejections map to client errors; transient store failures answer
/// 503 so callers know a retry is worthwhile.
pub fn ledger_error_to_response(err: LedgerError) -> axum::response::Response {
    match err {
        LedgerError::Domain(e) => match e {
            DomainError::Validation(msg) => {
                json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
            }
            DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
            DomainError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, "not_found", msg),
            DomainError::DuplicateAllocation(msg) => {
                json_error(StatusCode::CONFLICT, "duplicate_allocation", msg)
            }
            DomainError::DuplicateAssignment(msg) => {
                json_error(StatusCode::CONFLICT, "duplicate_assignment", msg)
            }
            DomainError::InsufficientStock { available, requested } => json_error(
                StatusCode::CONFLICT,
                "insufficient_stock",
                format!("requested {requested}, only {available} available"),
            ),
            DomainError::NegativeStock { current, delta } => json_error(
                StatusCode::CONFLICT,
                "negative_stock",
                format!("delta {delta} would drive stock {current} negative"),
            ),
            DomainError::ToolUnavailable(msg) => {
                json_error(StatusCode::CONFLICT, "tool_unavailable", msg)
            }
            DomainError::InvalidOperation(msg) => {
                json_error(StatusCode::UNPROCESSABLE_ENTITY, "invalid_operation", msg)
            }
            DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        },
        LedgerError::Store(e) => match e {
            StoreError::Concurrency(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
            StoreError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, "not_found", msg),
            StoreError::Duplicate(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
            e if e.is_transient() => {
                json_error(StatusCode::SERVICE_UNAVAILABLE, "unavailable", e.to_string())
            }
            e => json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "store_error",
                e.to_string(),
            ),
        },
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
