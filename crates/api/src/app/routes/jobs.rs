use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use fieldstock_core::{JobId, JobMaterialId, JobToolId};

use crate::app::errors::{self, json_error};
use crate::app::{dto, services::AppServices};

pub fn router() -> Router {
    Router::new()
        .route(
            "/jobs/:job_id/materials",
            get(list_job_materials).post(add_job_material),
        )
        .route(
            "/job-materials/:id",
            axum::routing::patch(update_job_material).delete(remove_job_material),
        )
        .route("/jobs/:job_id/tools", get(list_job_tools).post(assign_job_tool))
        .route("/job-tools/:id/return", post(return_job_tool))
}

fn parse_job_id(id: &str) -> Result<JobId, axum::response::Response> {
    id.parse()
        .map_err(|_| json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid job id"))
}

pub async fn add_job_material(
    Extension(services): Extension<Arc<AppServices>>,
    Path(job_id): Path<String>,
    Json(body): Json<dto::AddJobMaterialRequest>,
) -> axum::response::Response {
    let job_id = match parse_job_id(&job_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.allocator.add_material_to_job(
        job_id,
        body.material_id,
        body.quantity_used,
        body.notes,
    ) {
        Ok(allocation) => (StatusCode::CREATED, Json(allocation)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn list_job_materials(
    Extension(services): Extension<Arc<AppServices>>,
    Path(job_id): Path<String>,
) -> axum::response::Response {
    let job_id = match parse_job_id(&job_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.allocator.job_materials(job_id) {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn update_job_material(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateJobMaterialRequest>,
) -> axum::response::Response {
    let id: JobMaterialId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid job material id")
        }
    };
    match services
        .allocator
        .update_job_material(id, body.quantity_used, body.notes)
    {
        Ok(allocation) => Json(allocation).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn remove_job_material(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: JobMaterialId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid job material id")
        }
    };
    match services.allocator.remove_material_from_job(id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn assign_job_tool(
    Extension(services): Extension<Arc<AppServices>>,
    Path(job_id): Path<String>,
    Json(body): Json<dto::AssignJobToolRequest>,
) -> axum::response::Response {
    let job_id = match parse_job_id(&job_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services
        .tools
        .assign_tool_to_job(job_id, body.material_id, body.assigned_by_name)
    {
        Ok(job_tool) => (StatusCode::CREATED, Json(job_tool)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn list_job_tools(
    Extension(services): Extension<Arc<AppServices>>,
    Path(job_id): Path<String>,
) -> axum::response::Response {
    let job_id = match parse_job_id(&job_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.tools.job_tools(job_id) {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn return_job_tool(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: JobToolId = match id.parse() {
        Ok(v) => v,
        Err(_) => return json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid job tool id"),
    };
    match services.tools.return_job_tool(id) {
        Ok(job_tool) => Json(job_tool).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}
