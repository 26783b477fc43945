//! Request DTOs for handlers whose body is not a domain type already.
//!
//! Material creation and patching deserialize straight into `NewMaterial`
//! and `MaterialPatch`; checkout into `CheckoutRequest`. The shapes here
//! cover the rest.

use chrono::NaiveDate;
use serde::Deserialize;

use fieldstock_core::MaterialId;
use fieldstock_inventory::TransactionType;

#[derive(Debug, Deserialize)]
pub struct RecordTransactionRequest {
    pub transaction_type: TransactionType,
    pub quantity: i64,
    #[serde(default)]
    pub unit_cost: Option<u64>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddJobMaterialRequest {
    pub material_id: MaterialId,
    pub quantity_used: i64,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateJobMaterialRequest {
    #[serde(default)]
    pub quantity_used: Option<i64>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct CheckinRequest {
    #[serde(default)]
    pub condition_at_return: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleMaintenanceRequest {
    pub scheduled_date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct CompleteMaintenanceRequest {
    #[serde(default)]
    pub cost: Option<u64>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignJobToolRequest {
    pub material_id: MaterialId,
    #[serde(default)]
    pub assigned_by_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MaintenanceHorizonQuery {
    #[serde(default)]
    pub horizon_days: Option<i64>,
}
