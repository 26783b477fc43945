use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::json;

use fieldstock_infra::InMemoryLedgerStore;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, over a fresh in-memory store, on an ephemeral port.
        let app = fieldstock_api::app::build_app(Arc::new(InMemoryLedgerStore::new()));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn create_material(
    client: &reqwest::Client,
    base_url: &str,
    body: serde_json::Value,
) -> serde_json::Value {
    let res = client
        .post(format!("{base_url}/materials"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    res.json().await.unwrap()
}

fn pipe_body() -> serde_json::Value {
    json!({
        "name": "Copper pipe",
        "category": "plumbing",
        "sku": "CU-15",
        "unit_cost": 1200,
        "initial_stock": 50,
        "min_stock": 5,
        "reorder_point": 10
    })
}

fn drill_body() -> serde_json::Value {
    json!({
        "name": "Hammer drill",
        "category": "power tools",
        "unit_cost": 28000,
        "initial_stock": 1,
        "is_tool": true
    })
}

#[tokio::test]
async fn health_endpoint_answers_ok() {
    let srv = TestServer::spawn().await;
    let res = reqwest::Client::new()
        .get(format!("{}/health", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn material_crud_round_trip() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let material = create_material(&client, &srv.base_url, pipe_body()).await;
    let id = material["id"].as_str().unwrap().to_string();
    assert_eq!(material["current_stock"], 50);
    assert_eq!(material["tool_status"], serde_json::Value::Null);

    let res = client
        .get(format!("{}/materials/{}", srv.base_url, id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .patch(format!("{}/materials/{}", srv.base_url, id))
        .json(&json!({ "name": "Copper pipe 15mm", "unit_cost": 1300 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let patched: serde_json::Value = res.json().await.unwrap();
    assert_eq!(patched["name"], "Copper pipe 15mm");
    // Stock is not patchable; the balance only moves through transactions.
    assert_eq!(patched["current_stock"], 50);

    let res = client
        .delete(format!("{}/materials/{}", srv.base_url, id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let deleted: serde_json::Value = res.json().await.unwrap();
    assert_eq!(deleted["is_active"], false);

    // Second delete is idempotent.
    let res = client
        .delete(format!("{}/materials/{}", srv.base_url, id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn invalid_and_unknown_material_ids() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/materials/not-a-uuid", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .get(format!(
            "{}/materials/{}",
            srv.base_url,
            uuid::Uuid::now_v7()
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_required_fields_reject_with_400() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/materials", srv.base_url))
        .json(&json!({ "name": "", "category": "plumbing", "unit_cost": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn transactions_move_the_balance_and_keep_history() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let material = create_material(&client, &srv.base_url, pipe_body()).await;
    let id = material["id"].as_str().unwrap();

    let res = client
        .post(format!("{}/materials/{}/transactions", srv.base_url, id))
        .json(&json!({ "transaction_type": "usage", "quantity": -20 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["material"]["current_stock"], 30);
    assert_eq!(body["transaction"]["previous_stock"], 50);
    assert_eq!(body["transaction"]["new_stock"], 30);

    // Overdraw answers 409 and leaves the balance alone.
    let res = client
        .post(format!("{}/materials/{}/transactions", srv.base_url, id))
        .json(&json!({ "transaction_type": "usage", "quantity": -31 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "insufficient_stock");

    let res = client
        .get(format!("{}/materials/{}/transactions", srv.base_url, id))
        .send()
        .await
        .unwrap();
    let history: Vec<serde_json::Value> = res.json().await.unwrap();
    // Seed purchase + one usage, newest first.
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["transaction_type"], "usage");
    assert_eq!(history[1]["transaction_type"], "purchase");
}

#[tokio::test]
async fn job_material_allocation_flow() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let material = create_material(&client, &srv.base_url, pipe_body()).await;
    let material_id = material["id"].as_str().unwrap();
    let job_id = uuid::Uuid::now_v7();

    let res = client
        .post(format!("{}/jobs/{}/materials", srv.base_url, job_id))
        .json(&json!({ "material_id": material_id, "quantity_used": 12 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let allocation: serde_json::Value = res.json().await.unwrap();
    assert_eq!(allocation["unit_cost"], 1200);
    assert_eq!(allocation["total_cost"], 12 * 1200);

    // Duplicate pair answers 409.
    let res = client
        .post(format!("{}/jobs/{}/materials", srv.base_url, job_id))
        .json(&json!({ "material_id": material_id, "quantity_used": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "duplicate_allocation");

    // The allocation consumed stock.
    let res = client
        .get(format!("{}/materials/{}", srv.base_url, material_id))
        .send()
        .await
        .unwrap();
    let material: serde_json::Value = res.json().await.unwrap();
    assert_eq!(material["current_stock"], 38);

    let res = client
        .get(format!("{}/jobs/{}/materials", srv.base_url, job_id))
        .send()
        .await
        .unwrap();
    let rows: Vec<serde_json::Value> = res.json().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["material_name"], "Copper pipe");

    // Removal restocks.
    let allocation_id = allocation["id"].as_str().unwrap();
    let res = client
        .delete(format!("{}/job-materials/{}", srv.base_url, allocation_id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    let res = client
        .get(format!("{}/materials/{}", srv.base_url, material_id))
        .send()
        .await
        .unwrap();
    let material: serde_json::Value = res.json().await.unwrap();
    assert_eq!(material["current_stock"], 50);
}

#[tokio::test]
async fn tool_checkout_conflict_and_checkin() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let tool = create_material(&client, &srv.base_url, drill_body()).await;
    let tool_id = tool["id"].as_str().unwrap();
    assert_eq!(tool["tool_status"], "available");

    let res = client
        .post(format!("{}/tools/{}/checkout", srv.base_url, tool_id))
        .json(&json!({ "assigned_to_name": "Dana" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let assignment: serde_json::Value = res.json().await.unwrap();
    assert_eq!(assignment["status"], "active");

    let res = client
        .post(format!("{}/tools/{}/checkout", srv.base_url, tool_id))
        .json(&json!({ "assigned_to_name": "Riley" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "tool_unavailable");

    let assignment_id = assignment["id"].as_str().unwrap();
    let res = client
        .post(format!(
            "{}/tool-assignments/{}/checkin",
            srv.base_url, assignment_id
        ))
        .json(&json!({ "condition_at_return": "good" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(format!("{}/materials/{}", srv.base_url, tool_id))
        .send()
        .await
        .unwrap();
    let tool: serde_json::Value = res.json().await.unwrap();
    assert_eq!(tool["tool_status"], "available");

    let res = client
        .get(format!("{}/tools/{}/assignments", srv.base_url, tool_id))
        .send()
        .await
        .unwrap();
    let history: Vec<serde_json::Value> = res.json().await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["status"], "returned");
}

#[tokio::test]
async fn checkout_of_a_consumable_is_unprocessable() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let material = create_material(&client, &srv.base_url, pipe_body()).await;
    let id = material["id"].as_str().unwrap();

    let res = client
        .post(format!("{}/tools/{}/checkout", srv.base_url, id))
        .json(&json!({ "assigned_to_name": "Dana" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_operation");
}

#[tokio::test]
async fn maintenance_flow_over_http() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let tool = create_material(&client, &srv.base_url, drill_body()).await;
    let tool_id = tool["id"].as_str().unwrap();

    let res = client
        .post(format!("{}/tools/{}/maintenance", srv.base_url, tool_id))
        .json(&json!({ "scheduled_date": "2026-09-15", "notes": "annual service" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let event: serde_json::Value = res.json().await.unwrap();
    assert_eq!(event["status"], "scheduled");
    let event_id = event["id"].as_str().unwrap();

    let res = client
        .post(format!("{}/tool-maintenance/{}/start", srv.base_url, event_id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(format!("{}/materials/{}", srv.base_url, tool_id))
        .send()
        .await
        .unwrap();
    let tool: serde_json::Value = res.json().await.unwrap();
    assert_eq!(tool["tool_status"], "maintenance");

    let res = client
        .post(format!(
            "{}/tool-maintenance/{}/complete",
            srv.base_url, event_id
        ))
        .json(&json!({ "cost": 4500 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let event: serde_json::Value = res.json().await.unwrap();
    assert_eq!(event["status"], "completed");
    assert_eq!(event["cost"], 4500);

    let res = client
        .get(format!("{}/materials/{}", srv.base_url, tool_id))
        .send()
        .await
        .unwrap();
    let tool: serde_json::Value = res.json().await.unwrap();
    assert_eq!(tool["tool_status"], "available");
}

#[tokio::test]
async fn retirement_blocks_further_checkouts() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let tool = create_material(&client, &srv.base_url, drill_body()).await;
    let tool_id = tool["id"].as_str().unwrap();

    let res = client
        .post(format!("{}/tools/{}/retire", srv.base_url, tool_id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let tool: serde_json::Value = res.json().await.unwrap();
    assert_eq!(tool["tool_status"], "retired");

    let res = client
        .post(format!("{}/tools/{}/checkout", srv.base_url, tool_id))
        .json(&json!({ "assigned_to_name": "Dana" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn rollup_endpoints_reflect_the_ledger() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    create_material(&client, &srv.base_url, pipe_body()).await;
    let empty = create_material(
        &client,
        &srv.base_url,
        json!({
            "name": "Solder wire",
            "category": "electrical",
            "unit_cost": 800,
            "initial_stock": 0,
            "min_stock": 2,
            "reorder_point": 4
        }),
    )
    .await;
    let tool = create_material(&client, &srv.base_url, drill_body()).await;
    let tool_id = tool["id"].as_str().unwrap();

    let res = client
        .get(format!("{}/inventory/summary", srv.base_url))
        .send()
        .await
        .unwrap();
    let summary: serde_json::Value = res.json().await.unwrap();
    assert_eq!(summary["material_count"], 3);
    assert_eq!(summary["out_of_stock_count"], 1);

    let res = client
        .get(format!("{}/inventory/alerts", srv.base_url))
        .send()
        .await
        .unwrap();
    let alerts: Vec<serde_json::Value> = res.json().await.unwrap();
    assert!(alerts
        .iter()
        .any(|a| a["material_id"] == empty["id"] && a["kind"] == "out_of_stock"));

    let res = client
        .get(format!("{}/inventory/categories", srv.base_url))
        .send()
        .await
        .unwrap();
    let categories: Vec<String> = res.json().await.unwrap();
    assert_eq!(categories, vec!["electrical", "plumbing", "power tools"]);

    client
        .post(format!("{}/tools/{}/checkout", srv.base_url, tool_id))
        .json(&json!({ "assigned_to_name": "Dana" }))
        .send()
        .await
        .unwrap();

    let res = client
        .get(format!("{}/tools/utilization", srv.base_url))
        .send()
        .await
        .unwrap();
    let report: serde_json::Value = res.json().await.unwrap();
    assert_eq!(report["status"], "available");
    let tools = report["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0]["active_assignments"], 1);
}

#[tokio::test]
async fn overdue_and_maintenance_due_endpoints() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let tool = create_material(&client, &srv.base_url, drill_body()).await;
    let tool_id = tool["id"].as_str().unwrap();

    let past = chrono::Utc::now() - chrono::Duration::days(2);
    client
        .post(format!("{}/tools/{}/checkout", srv.base_url, tool_id))
        .json(&json!({
            "assigned_to_name": "Dana",
            "expected_return_date": past,
        }))
        .send()
        .await
        .unwrap();

    let res = client
        .get(format!("{}/tools/overdue", srv.base_url))
        .send()
        .await
        .unwrap();
    let overdue: Vec<serde_json::Value> = res.json().await.unwrap();
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0]["assigned_to_name"], "Dana");

    let soon = (chrono::Utc::now() + chrono::Duration::days(7)).date_naive();
    create_material(
        &client,
        &srv.base_url,
        json!({
            "name": "Generator",
            "category": "power",
            "unit_cost": 90000,
            "initial_stock": 1,
            "is_tool": true,
            "next_maintenance_date": soon
        }),
    )
    .await;

    let res = client
        .get(format!(
            "{}/tools/maintenance-due?horizon_days=30",
            srv.base_url
        ))
        .send()
        .await
        .unwrap();
    let due: Vec<serde_json::Value> = res.json().await.unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0]["name"], "Generator");
    assert_eq!(due[0]["days_until_maintenance"], 7);

    let res = client
        .get(format!(
            "{}/tools/maintenance-due?horizon_days=3",
            srv.base_url
        ))
        .send()
        .await
        .unwrap();
    let due: Vec<serde_json::Value> = res.json().await.unwrap();
    assert!(due.is_empty());
}
