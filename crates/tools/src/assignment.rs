use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fieldstock_core::{AssignmentId, DomainError, DomainResult, Entity, JobId, MaterialId};
use fieldstock_inventory::{Material, ToolStatus};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStatus {
    Active,
    Returned,
}

/// Caller-supplied fields for a tool checkout.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckoutRequest {
    pub assigned_to_name: String,
    #[serde(default)]
    pub expected_return_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub job_id: Option<JobId>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub condition_at_assignment: Option<String>,
}

/// One checkout event. Never deleted; checkin closes it in place.
///
/// At most one `active` assignment exists per material. The status flag on
/// the owning material gates new checkouts, and the store enforces the
/// uniqueness again on insert so a racing second checkout cannot slip
/// through between the status read and the write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolAssignment {
    pub id: AssignmentId,
    pub material_id: MaterialId,
    pub assigned_to_name: String,
    pub assigned_date: DateTime<Utc>,
    pub expected_return_date: Option<DateTime<Utc>>,
    pub actual_return_date: Option<DateTime<Utc>>,
    pub job_id: Option<JobId>,
    pub status: AssignmentStatus,
    pub condition_at_assignment: Option<String>,
    pub condition_at_return: Option<String>,
    pub notes: Option<String>,
}

impl ToolAssignment {
    /// Decide a checkout: validates the request and the tool's state, and
    /// returns the new assignment plus the status the material must move to.
    pub fn checkout(
        id: AssignmentId,
        material: &Material,
        request: CheckoutRequest,
        now: DateTime<Utc>,
    ) -> DomainResult<(Self, ToolStatus)> {
        let status = material.require_tool_status()?;
        if !material.is_active {
            return Err(DomainError::invalid_operation(format!(
                "tool '{}' is inactive",
                material.name
            )));
        }
        match status {
            ToolStatus::Available => {}
            ToolStatus::Assigned => {
                return Err(DomainError::tool_unavailable(format!(
                    "tool '{}' is already checked out",
                    material.name
                )));
            }
            ToolStatus::Maintenance => {
                return Err(DomainError::tool_unavailable(format!(
                    "tool '{}' is in maintenance",
                    material.name
                )));
            }
            ToolStatus::Retired => {
                return Err(DomainError::tool_unavailable(format!(
                    "tool '{}' is retired",
                    material.name
                )));
            }
        }
        if request.assigned_to_name.trim().is_empty() {
            return Err(DomainError::validation("assigned_to_name cannot be empty"));
        }

        let assignment = Self {
            id,
            material_id: material.id,
            assigned_to_name: request.assigned_to_name,
            assigned_date: now,
            expected_return_date: request.expected_return_date,
            actual_return_date: None,
            job_id: request.job_id,
            status: AssignmentStatus::Active,
            condition_at_assignment: request.condition_at_assignment,
            condition_at_return: None,
            notes: request.notes,
        };

        Ok((assignment, ToolStatus::Assigned))
    }

    /// Close this assignment on checkin and return the status the owning
    /// material moves back to. Post-use inspection is modeled as an explicit
    /// maintenance step, so checkin always lands on `available`.
    pub fn close(
        &mut self,
        condition_at_return: Option<String>,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<ToolStatus> {
        if self.status != AssignmentStatus::Active {
            return Err(DomainError::invalid_operation(
                "assignment is already returned",
            ));
        }
        self.status = AssignmentStatus::Returned;
        self.actual_return_date = Some(now);
        self.condition_at_return = condition_at_return;
        if notes.is_some() {
            self.notes = notes;
        }
        Ok(ToolStatus::Available)
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == AssignmentStatus::Active
            && self.expected_return_date.is_some_and(|d| d < now)
    }
}

impl Entity for ToolAssignment {
    type Id = AssignmentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
