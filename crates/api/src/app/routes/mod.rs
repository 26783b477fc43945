use axum::Router;

pub mod inventory;
pub mod jobs;
pub mod materials;
pub mod system;
pub mod tools;

/// Router for all resource endpoints.
pub fn router() -> Router {
    Router::new()
        .merge(materials::router())
        .merge(jobs::router())
        .merge(tools::router())
        .merge(inventory::router())
}
