use std::sync::Arc;

use axum::{extract::Extension, response::IntoResponse, routing::get, Json, Router};

use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/inventory/summary", get(summary))
        .route("/inventory/alerts", get(alerts))
        .route("/inventory/categories", get(categories))
}

pub async fn summary(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.ledger.inventory_summary() {
        Ok(summary) => Json(summary).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn alerts(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.ledger.stock_alerts() {
        Ok(alerts) => Json(alerts).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn categories(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.analytics.material_categories() {
        Ok(categories) => Json(categories).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}
