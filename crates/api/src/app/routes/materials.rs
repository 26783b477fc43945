use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use fieldstock_core::MaterialId;
use fieldstock_inventory::{MaterialPatch, NewMaterial};

use crate::app::errors::{self, json_error};
use crate::app::{dto, services::AppServices};

pub fn router() -> Router {
    Router::new()
        .route("/materials", get(list_materials).post(create_material))
        .route(
            "/materials/:id",
            get(get_material)
                .patch(update_material)
                .delete(delete_material),
        )
        .route(
            "/materials/:id/transactions",
            get(list_transactions).post(record_transaction),
        )
}

fn parse_material_id(id: &str) -> Result<MaterialId, axum::response::Response> {
    id.parse()
        .map_err(|_| json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid material id"))
}

pub async fn create_material(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<NewMaterial>,
) -> axum::response::Response {
    match services.ledger.create_material(body) {
        Ok(material) => (StatusCode::CREATED, Json(material)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn list_materials(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.ledger.materials() {
        Ok(materials) => Json(materials).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn get_material(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_material_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.ledger.material(id) {
        Ok(material) => Json(material).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn update_material(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<MaterialPatch>,
) -> axum::response::Response {
    let id = match parse_material_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.ledger.update_material(id, body) {
        Ok(material) => Json(material).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn delete_material(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_material_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.ledger.delete_material(id) {
        Ok(material) => Json(material).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn record_transaction(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::RecordTransactionRequest>,
) -> axum::response::Response {
    let id = match parse_material_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.ledger.record_transaction(
        id,
        body.transaction_type,
        body.quantity,
        body.unit_cost,
        body.notes,
    ) {
        Ok((material, transaction)) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "material": material,
                "transaction": transaction,
            })),
        )
            .into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn list_transactions(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_material_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.ledger.transactions(id) {
        Ok(transactions) => Json(transactions).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}
