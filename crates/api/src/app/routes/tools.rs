use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use fieldstock_core::{AssignmentId, MaintenanceId, MaterialId};
use fieldstock_infra::engine::tool_lifecycle::DEFAULT_MAINTENANCE_HORIZON_DAYS;
use fieldstock_tools::CheckoutRequest;

use crate::app::errors::{self, json_error};
use crate::app::{dto, services::AppServices};

pub fn router() -> Router {
    Router::new()
        .route("/tools/overdue", get(overdue_returns))
        .route("/tools/maintenance-due", get(maintenance_due))
        .route("/tools/utilization", get(tool_utilization))
        .route("/tools/:id/checkout", post(checkout_tool))
        .route("/tools/:id/maintenance", post(schedule_maintenance))
        .route("/tools/:id/retire", post(retire_tool))
        .route("/tools/:id/assignments", get(tool_assignments))
        .route("/tool-assignments/:id/checkin", post(checkin_tool))
        .route("/tool-maintenance/:id/start", post(start_maintenance))
        .route("/tool-maintenance/:id/complete", post(complete_maintenance))
}

fn parse_material_id(id: &str) -> Result<MaterialId, axum::response::Response> {
    id.parse()
        .map_err(|_| json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid tool id"))
}

fn parse_maintenance_id(id: &str) -> Result<MaintenanceId, axum::response::Response> {
    id.parse()
        .map_err(|_| json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid maintenance id"))
}

pub async fn checkout_tool(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<CheckoutRequest>,
) -> axum::response::Response {
    let id = match parse_material_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.tools.checkout_tool(id, body) {
        Ok(assignment) => (StatusCode::CREATED, Json(assignment)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn checkin_tool(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::CheckinRequest>,
) -> axum::response::Response {
    let id: AssignmentId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid assignment id")
        }
    };
    match services
        .tools
        .checkin_tool(id, body.condition_at_return, body.notes)
    {
        Ok(assignment) => Json(assignment).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn schedule_maintenance(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::ScheduleMaintenanceRequest>,
) -> axum::response::Response {
    let id = match parse_material_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services
        .tools
        .schedule_tool_maintenance(id, body.scheduled_date, body.notes)
    {
        Ok(event) => (StatusCode::CREATED, Json(event)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn start_maintenance(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_maintenance_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.tools.start_tool_maintenance(id) {
        Ok(event) => Json(event).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn complete_maintenance(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::CompleteMaintenanceRequest>,
) -> axum::response::Response {
    let id = match parse_maintenance_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services
        .tools
        .complete_tool_maintenance(id, body.cost, body.notes)
    {
        Ok(event) => Json(event).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn retire_tool(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_material_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.tools.retire_tool(id) {
        Ok(material) => Json(material).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn tool_assignments(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_material_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.tools.tool_assignments(id) {
        Ok(assignments) => Json(assignments).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn overdue_returns(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.tools.overdue_returns() {
        Ok(assignments) => Json(assignments).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn maintenance_due(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::MaintenanceHorizonQuery>,
) -> axum::response::Response {
    let horizon = query
        .horizon_days
        .unwrap_or(DEFAULT_MAINTENANCE_HORIZON_DAYS);
    if horizon < 0 {
        return json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "horizon_days must be non-negative",
        );
    }
    match services.tools.tools_due_for_maintenance(horizon) {
        Ok(due) => Json(due).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn tool_utilization(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.analytics.tool_utilization() {
        Ok(report) => Json(report).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}
