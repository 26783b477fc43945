//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: engine services wired over one shared store
//! - `routes/`: HTTP routes + handlers (one file per resource area)
//! - `dto.rs`: request DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};

use fieldstock_infra::LedgerStore;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router over the given store (public entrypoint used
/// by `main.rs` and the black-box tests).
pub fn build_app(store: Arc<dyn LedgerStore>) -> Router {
    let services = Arc::new(services::AppServices::new(store));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::router())
        .layer(Extension(services))
}
