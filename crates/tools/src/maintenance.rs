use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use fieldstock_core::{DomainError, DomainResult, Entity, MaintenanceId, MaterialId};
use fieldstock_inventory::{Material, ToolStatus};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceStatus {
    Scheduled,
    InProgress,
    Completed,
    Canceled,
}

/// A scheduled or completed maintenance event for a tool.
///
/// Scheduling does not touch the tool's status; `start` flips the tool to
/// `maintenance` and `complete` brings it back to `available`. That keeps
/// the material-side transition explicit instead of implied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolMaintenance {
    pub id: MaintenanceId,
    pub material_id: MaterialId,
    pub scheduled_date: NaiveDate,
    pub completed_date: Option<NaiveDate>,
    pub status: MaintenanceStatus,
    pub cost: Option<u64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ToolMaintenance {
    pub fn schedule(
        id: MaintenanceId,
        material: &Material,
        scheduled_date: NaiveDate,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let status = material.require_tool_status()?;
        if status == ToolStatus::Retired {
            return Err(DomainError::invalid_operation(format!(
                "tool '{}' is retired",
                material.name
            )));
        }
        Ok(Self {
            id,
            material_id: material.id,
            scheduled_date,
            completed_date: None,
            status: MaintenanceStatus::Scheduled,
            cost: None,
            notes,
            created_at: now,
        })
    }

    /// Begin the work: the tool leaves circulation (`maintenance`).
    ///
    /// A checked-out tool cannot enter maintenance; it has to come back
    /// first.
    pub fn start(&mut self, material: &Material) -> DomainResult<ToolStatus> {
        if self.status != MaintenanceStatus::Scheduled {
            return Err(DomainError::invalid_operation(format!(
                "maintenance is {:?}, expected scheduled",
                self.status
            )));
        }
        let status = material.require_tool_status()?;
        if status != ToolStatus::Available {
            return Err(DomainError::tool_unavailable(format!(
                "tool '{}' is not available for maintenance",
                material.name
            )));
        }
        self.status = MaintenanceStatus::InProgress;
        Ok(ToolStatus::Maintenance)
    }

    /// Finish the work: record cost/notes and return the tool to circulation.
    pub fn complete(
        &mut self,
        completed_date: NaiveDate,
        cost: Option<u64>,
        notes: Option<String>,
    ) -> DomainResult<ToolStatus> {
        if self.status != MaintenanceStatus::InProgress {
            return Err(DomainError::invalid_operation(format!(
                "maintenance is {:?}, expected in_progress",
                self.status
            )));
        }
        self.status = MaintenanceStatus::Completed;
        self.completed_date = Some(completed_date);
        self.cost = cost;
        if notes.is_some() {
            self.notes = notes;
        }
        Ok(ToolStatus::Available)
    }

    /// Drop a scheduled event that never started. The tool is untouched.
    pub fn cancel(&mut self) -> DomainResult<()> {
        if self.status != MaintenanceStatus::Scheduled {
            return Err(DomainError::invalid_operation(format!(
                "maintenance is {:?}, expected scheduled",
                self.status
            )));
        }
        self.status = MaintenanceStatus::Canceled;
        Ok(())
    }
}

impl Entity for ToolMaintenance {
    type Id = MaintenanceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// A tool whose `next_maintenance_date` falls within the horizon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaintenanceDue {
    pub material_id: MaterialId,
    pub name: String,
    pub category: String,
    pub next_maintenance_date: NaiveDate,
    pub days_until_maintenance: i64,
}

/// Check one material against the maintenance horizon `[today, today+horizon]`.
pub fn due_within(material: &Material, today: NaiveDate, horizon_days: i64) -> Option<MaintenanceDue> {
    if !material.is_tool || !material.is_active {
        return None;
    }
    let date = material.next_maintenance_date?;
    if date < today || date - today > chrono::Duration::days(horizon_days) {
        return None;
    }
    Some(MaintenanceDue {
        material_id: material.id,
        name: material.name.clone(),
        category: material.category.clone(),
        next_maintenance_date: date,
        days_until_maintenance: (date - today).num_days(),
    })
}
