use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fieldstock_core::{DomainError, DomainResult, Entity, JobId, JobToolId, MaterialId};
use fieldstock_inventory::{Material, ToolStatus};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobToolStatus {
    Assigned,
    Returned,
}

/// Association of a tool to a job for the duration of work.
///
/// Distinct from `ToolAssignment`: this is the job-side booking, the other
/// is the personnel checkout. A tool can be on a job and checked out to a
/// person at the same time; the two tracks never gate each other. At most
/// one `assigned` row exists per (job, material), enforced by the store on
/// insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobTool {
    pub id: JobToolId,
    pub job_id: JobId,
    pub material_id: MaterialId,
    pub assigned_by_name: Option<String>,
    pub assigned_date: DateTime<Utc>,
    pub returned_date: Option<DateTime<Utc>>,
    pub status: JobToolStatus,
}

impl JobTool {
    pub fn assign(
        id: JobToolId,
        job_id: JobId,
        material: &Material,
        assigned_by_name: Option<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let status = material.require_tool_status()?;
        if !material.is_active {
            return Err(DomainError::invalid_operation(format!(
                "tool '{}' is inactive",
                material.name
            )));
        }
        if status == ToolStatus::Retired {
            return Err(DomainError::invalid_operation(format!(
                "tool '{}' is retired",
                material.name
            )));
        }
        Ok(Self {
            id,
            job_id,
            material_id: material.id,
            assigned_by_name,
            assigned_date: now,
            returned_date: None,
            status: JobToolStatus::Assigned,
        })
    }

    pub fn mark_returned(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status != JobToolStatus::Assigned {
            return Err(DomainError::invalid_operation(
                "job tool is already returned",
            ));
        }
        self.status = JobToolStatus::Returned;
        self.returned_date = Some(now);
        Ok(())
    }
}

impl Entity for JobTool {
    type Id = JobToolId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
