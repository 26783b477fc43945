//! Tool lifecycle: personnel checkout, maintenance, job assignment, retirement.
//!
//! Status machine: `available → assigned → available`,
//! `available → maintenance → available`, and any state → `retired`
//! (terminal). Checkout is a single conditional store operation so two
//! workers cannot both walk off with the last impact driver.

use chrono::{NaiveDate, Utc};
use tracing::{info, instrument};

use fieldstock_core::{
    AssignmentId, DomainError, ExpectedVersion, JobId, JobToolId, MaintenanceId, MaterialId,
};
use fieldstock_inventory::Material;
use fieldstock_tools::{
    due_within, retire_target, CheckoutRequest, JobTool, MaintenanceDue, ToolAssignment,
    ToolMaintenance,
};

use crate::store::{LedgerStore, StoreError};

use super::{LedgerError, LedgerResult};

pub const DEFAULT_MAINTENANCE_HORIZON_DAYS: i64 = 30;

#[derive(Debug, Clone)]
pub struct ToolLifecycleManager<S> {
    store: S,
}

impl<S: LedgerStore> ToolLifecycleManager<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn material(&self, id: MaterialId) -> LedgerResult<Material> {
        self.store
            .material(id)?
            .ok_or_else(|| DomainError::not_found(format!("material {id}")).into())
    }

    /// Check a tool out to a person.
    ///
    /// The status flip and the `active` assignment row are committed as one
    /// conditional store operation. Losing that commit to a concurrent
    /// checkout surfaces as `ToolUnavailable`, the same answer the loser
    /// would have gotten moments later.
    #[instrument(skip(self, request), fields(assigned_to = %request.assigned_to_name), err)]
    pub fn checkout_tool(
        &self,
        material_id: MaterialId,
        request: CheckoutRequest,
    ) -> LedgerResult<ToolAssignment> {
        let mut material = self.material(material_id)?;
        let read_version = material.version;
        let now = Utc::now();
        let (assignment, status) =
            ToolAssignment::checkout(AssignmentId::new(), &material, request, now)?;
        material.tool_status = Some(status);
        material.updated_at = now;

        match self.store.commit_checkout(
            material,
            ExpectedVersion::Exact(read_version),
            assignment,
        ) {
            Ok((_, assignment)) => {
                info!(material_id = %material_id, assignment_id = %assignment.id, "tool checked out");
                Ok(assignment)
            }
            Err(StoreError::Concurrency(_)) | Err(StoreError::Duplicate(_)) => {
                Err(DomainError::tool_unavailable(
                    "tool was checked out by someone else",
                )
                .into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Close an assignment and return the tool to `available`.
    #[instrument(skip(self, condition_at_return, notes), err)]
    pub fn checkin_tool(
        &self,
        assignment_id: AssignmentId,
        condition_at_return: Option<String>,
        notes: Option<String>,
    ) -> LedgerResult<ToolAssignment> {
        let mut assignment = self
            .store
            .assignment(assignment_id)?
            .ok_or_else(|| DomainError::not_found(format!("assignment {assignment_id}")))?;

        let now = Utc::now();
        let status = assignment.close(condition_at_return, notes, now)?;

        let mut material = self.material(assignment.material_id)?;
        let read_version = material.version;
        material.tool_status = Some(status);
        material.updated_at = now;

        let (_, assignment) = self.store.commit_checkin(
            material,
            ExpectedVersion::Exact(read_version),
            assignment,
        )?;
        info!(assignment_id = %assignment_id, "tool checked in");
        Ok(assignment)
    }

    /// Create a `scheduled` maintenance row. Does not touch the tool's
    /// status; that happens when the work starts.
    pub fn schedule_tool_maintenance(
        &self,
        material_id: MaterialId,
        scheduled_date: NaiveDate,
        notes: Option<String>,
    ) -> LedgerResult<ToolMaintenance> {
        let material = self.material(material_id)?;
        let event = ToolMaintenance::schedule(
            MaintenanceId::new(),
            &material,
            scheduled_date,
            notes,
            Utc::now(),
        )?;
        Ok(self.store.insert_maintenance(event)?)
    }

    /// Begin scheduled work: the tool leaves circulation.
    #[instrument(skip(self), err)]
    pub fn start_tool_maintenance(
        &self,
        maintenance_id: MaintenanceId,
    ) -> LedgerResult<ToolMaintenance> {
        let mut event = self
            .store
            .maintenance(maintenance_id)?
            .ok_or_else(|| DomainError::not_found(format!("maintenance {maintenance_id}")))?;
        let mut material = self.material(event.material_id)?;
        let read_version = material.version;

        let status = event.start(&material)?;
        material.tool_status = Some(status);
        material.updated_at = Utc::now();

        self.store
            .update_material(material, ExpectedVersion::Exact(read_version))?;
        Ok(self.store.update_maintenance(event)?)
    }

    /// Finish the work: record cost and put the tool back in circulation.
    #[instrument(skip(self, notes), err)]
    pub fn complete_tool_maintenance(
        &self,
        maintenance_id: MaintenanceId,
        cost: Option<u64>,
        notes: Option<String>,
    ) -> LedgerResult<ToolMaintenance> {
        let mut event = self
            .store
            .maintenance(maintenance_id)?
            .ok_or_else(|| DomainError::not_found(format!("maintenance {maintenance_id}")))?;
        let mut material = self.material(event.material_id)?;
        let read_version = material.version;

        let today = Utc::now().date_naive();
        let status = event.complete(today, cost, notes)?;
        material.tool_status = Some(status);
        material.updated_at = Utc::now();

        self.store
            .update_material(material, ExpectedVersion::Exact(read_version))?;
        let event = self.store.update_maintenance(event)?;
        info!(maintenance_id = %maintenance_id, "maintenance completed");
        Ok(event)
    }

    /// Drop a `scheduled` row that will not happen.
    pub fn cancel_tool_maintenance(
        &self,
        maintenance_id: MaintenanceId,
    ) -> LedgerResult<ToolMaintenance> {
        let mut event = self
            .store
            .maintenance(maintenance_id)?
            .ok_or_else(|| DomainError::not_found(format!("maintenance {maintenance_id}")))?;
        event.cancel()?;
        Ok(self.store.update_maintenance(event)?)
    }

    /// Permanently remove a tool from circulation. Terminal.
    #[instrument(skip(self), err)]
    pub fn retire_tool(&self, material_id: MaterialId) -> LedgerResult<Material> {
        let mut material = self.material(material_id)?;
        let read_version = material.version;
        let status = retire_target(&material)?;
        material.tool_status = Some(status);
        material.updated_at = Utc::now();
        let material = self
            .store
            .update_material(material, ExpectedVersion::Exact(read_version))?;
        info!(material_id = %material_id, "tool retired");
        Ok(material)
    }

    /// Active assignments past their expected return, soonest due first.
    pub fn overdue_returns(&self) -> LedgerResult<Vec<ToolAssignment>> {
        let now = Utc::now();
        let mut overdue: Vec<ToolAssignment> = self
            .store
            .active_assignments()?
            .into_iter()
            .filter(|a| a.is_overdue(now))
            .collect();
        overdue.sort_by_key(|a| a.expected_return_date);
        Ok(overdue)
    }

    /// Active tools whose `next_maintenance_date` falls within the horizon,
    /// soonest first.
    pub fn tools_due_for_maintenance(
        &self,
        horizon_days: i64,
    ) -> LedgerResult<Vec<MaintenanceDue>> {
        let today = Utc::now().date_naive();
        let mut due: Vec<MaintenanceDue> = self
            .store
            .materials()?
            .iter()
            .filter_map(|m| due_within(m, today, horizon_days))
            .collect();
        due.sort_by_key(|d| d.days_until_maintenance);
        Ok(due)
    }

    /// Track a tool on a job site. Orthogonal to personnel checkout; a tool
    /// can be checked out to a person and assigned to a job at once.
    #[instrument(skip(self, assigned_by_name), err)]
    pub fn assign_tool_to_job(
        &self,
        job_id: JobId,
        material_id: MaterialId,
        assigned_by_name: Option<String>,
    ) -> LedgerResult<JobTool> {
        let material = self.material(material_id)?;
        let job_tool = JobTool::assign(
            JobToolId::new(),
            job_id,
            &material,
            assigned_by_name,
            Utc::now(),
        )?;
        match self.store.insert_job_tool(job_tool) {
            Ok(job_tool) => Ok(job_tool),
            Err(StoreError::Duplicate(msg)) => {
                Err(DomainError::duplicate_assignment(msg).into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Close a job tool row.
    pub fn return_job_tool(&self, id: JobToolId) -> LedgerResult<JobTool> {
        let mut job_tool = self
            .store
            .job_tool(id)?
            .ok_or_else(|| DomainError::not_found(format!("job tool {id}")))?;
        job_tool.mark_returned(Utc::now())?;
        Ok(self.store.update_job_tool(job_tool)?)
    }

    /// Job tool rows for one job, most recent first.
    pub fn job_tools(&self, job_id: JobId) -> LedgerResult<Vec<JobTool>> {
        Ok(self.store.job_tools_for_job(job_id)?)
    }

    /// Assignment history for one tool, most recent first.
    pub fn tool_assignments(&self, material_id: MaterialId) -> LedgerResult<Vec<ToolAssignment>> {
        self.material(material_id)?;
        Ok(self.store.assignments_for_material(material_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::StockLedger;
    use crate::store::InMemoryLedgerStore;
    use chrono::Duration;
    use std::sync::Arc;
    use fieldstock_inventory::{NewMaterial, ToolStatus};
    use fieldstock_tools::{AssignmentStatus, JobToolStatus, MaintenanceStatus};

    fn setup() -> (
        StockLedger<Arc<InMemoryLedgerStore>>,
        ToolLifecycleManager<Arc<InMemoryLedgerStore>>,
    ) {
        let store = Arc::new(InMemoryLedgerStore::new());
        (
            StockLedger::new(store.clone()),
            ToolLifecycleManager::new(store),
        )
    }

    fn drill(ledger: &StockLedger<Arc<InMemoryLedgerStore>>) -> MaterialId {
        ledger
            .create_material(NewMaterial {
                name: "Hammer drill".to_string(),
                description: None,
                category: "power tools".to_string(),
                sku: Some("HD-200".to_string()),
                unit_cost: 28000,
                initial_stock: 1,
                min_stock: 0,
                reorder_point: 0,
                is_tool: true,
                next_maintenance_date: None,
            })
            .unwrap()
            .id
    }

    fn checkout_request(name: &str) -> CheckoutRequest {
        CheckoutRequest {
            assigned_to_name: name.to_string(),
            expected_return_date: None,
            job_id: None,
            notes: None,
            condition_at_assignment: None,
        }
    }

    #[test]
    fn checkout_flips_status_and_second_checkout_fails() {
        let (ledger, tools) = setup();
        let tool_id = drill(&ledger);

        let assignment = tools
            .checkout_tool(tool_id, checkout_request("Dana"))
            .unwrap();
        assert_eq!(assignment.status, AssignmentStatus::Active);
        assert_eq!(
            ledger.material(tool_id).unwrap().tool_status,
            Some(ToolStatus::Assigned)
        );

        let err = tools
            .checkout_tool(tool_id, checkout_request("Riley"))
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Domain(DomainError::ToolUnavailable(_))
        ));
    }

    #[test]
    fn checkin_returns_tool_to_available_and_is_not_repeatable() {
        let (ledger, tools) = setup();
        let tool_id = drill(&ledger);
        let assignment = tools
            .checkout_tool(tool_id, checkout_request("Dana"))
            .unwrap();

        let closed = tools
            .checkin_tool(assignment.id, Some("good".to_string()), None)
            .unwrap();
        assert_eq!(closed.status, AssignmentStatus::Returned);
        assert!(closed.actual_return_date.is_some());
        assert_eq!(
            ledger.material(tool_id).unwrap().tool_status,
            Some(ToolStatus::Available)
        );

        let err = tools.checkin_tool(assignment.id, None, None).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Domain(DomainError::InvalidOperation(_))
        ));
    }

    #[test]
    fn checkout_after_checkin_succeeds() {
        let (ledger, tools) = setup();
        let tool_id = drill(&ledger);
        let first = tools
            .checkout_tool(tool_id, checkout_request("Dana"))
            .unwrap();
        tools.checkin_tool(first.id, None, None).unwrap();

        tools
            .checkout_tool(tool_id, checkout_request("Riley"))
            .unwrap();
        let history = tools.tool_assignments(tool_id).unwrap();
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn checkout_of_a_consumable_is_an_invalid_operation() {
        let (ledger, tools) = setup();
        let material = ledger
            .create_material(NewMaterial {
                name: "Screws".to_string(),
                description: None,
                category: "fasteners".to_string(),
                sku: None,
                unit_cost: 10,
                initial_stock: 500,
                min_stock: 50,
                reorder_point: 100,
                is_tool: false,
                next_maintenance_date: None,
            })
            .unwrap();

        let err = tools
            .checkout_tool(material.id, checkout_request("Dana"))
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Domain(DomainError::InvalidOperation(_))
        ));
    }

    #[test]
    fn maintenance_cycle_flips_status_and_back() {
        let (ledger, tools) = setup();
        let tool_id = drill(&ledger);
        let date = Utc::now().date_naive() + Duration::days(3);

        let event = tools
            .schedule_tool_maintenance(tool_id, date, Some("annual service".to_string()))
            .unwrap();
        assert_eq!(event.status, MaintenanceStatus::Scheduled);
        // Scheduling alone leaves the tool in circulation.
        assert_eq!(
            ledger.material(tool_id).unwrap().tool_status,
            Some(ToolStatus::Available)
        );

        let event = tools.start_tool_maintenance(event.id).unwrap();
        assert_eq!(event.status, MaintenanceStatus::InProgress);
        assert_eq!(
            ledger.material(tool_id).unwrap().tool_status,
            Some(ToolStatus::Maintenance)
        );

        let event = tools
            .complete_tool_maintenance(event.id, Some(4500), None)
            .unwrap();
        assert_eq!(event.status, MaintenanceStatus::Completed);
        assert_eq!(event.cost, Some(4500));
        assert!(event.completed_date.is_some());
        assert_eq!(
            ledger.material(tool_id).unwrap().tool_status,
            Some(ToolStatus::Available)
        );
    }

    #[test]
    fn canceled_maintenance_cannot_be_started() {
        let (ledger, tools) = setup();
        let tool_id = drill(&ledger);
        let event = tools
            .schedule_tool_maintenance(tool_id, Utc::now().date_naive(), None)
            .unwrap();

        let event = tools.cancel_tool_maintenance(event.id).unwrap();
        assert_eq!(event.status, MaintenanceStatus::Canceled);
        // Cancellation never touches the tool itself.
        assert_eq!(
            ledger.material(tool_id).unwrap().tool_status,
            Some(ToolStatus::Available)
        );

        let err = tools.start_tool_maintenance(event.id).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Domain(DomainError::InvalidOperation(_))
        ));
    }

    #[test]
    fn maintenance_cannot_start_on_a_checked_out_tool() {
        let (ledger, tools) = setup();
        let tool_id = drill(&ledger);
        let event = tools
            .schedule_tool_maintenance(tool_id, Utc::now().date_naive(), None)
            .unwrap();
        tools
            .checkout_tool(tool_id, checkout_request("Dana"))
            .unwrap();

        let err = tools.start_tool_maintenance(event.id).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Domain(DomainError::ToolUnavailable(_))
        ));
    }

    #[test]
    fn retirement_is_terminal() {
        let (ledger, tools) = setup();
        let tool_id = drill(&ledger);

        let retired = tools.retire_tool(tool_id).unwrap();
        assert_eq!(retired.tool_status, Some(ToolStatus::Retired));

        let err = tools
            .checkout_tool(tool_id, checkout_request("Dana"))
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Domain(DomainError::ToolUnavailable(_))
        ));
        let err = tools.retire_tool(tool_id).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Domain(DomainError::InvalidOperation(_))
        ));
    }

    #[test]
    fn job_tool_pair_is_unique_while_assigned() {
        let (ledger, tools) = setup();
        let tool_id = drill(&ledger);
        let job_id = JobId::new();

        let job_tool = tools
            .assign_tool_to_job(job_id, tool_id, Some("Morgan".to_string()))
            .unwrap();
        let err = tools
            .assign_tool_to_job(job_id, tool_id, None)
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Domain(DomainError::DuplicateAssignment(_))
        ));

        let returned = tools.return_job_tool(job_tool.id).unwrap();
        assert_eq!(returned.status, JobToolStatus::Returned);
        // Re-assignment is allowed after return.
        tools.assign_tool_to_job(job_id, tool_id, None).unwrap();
    }

    #[test]
    fn overdue_returns_are_sorted_soonest_first() {
        let (ledger, tools) = setup();
        let a = drill(&ledger);
        let b = ledger
            .create_material(NewMaterial {
                name: "Tile saw".to_string(),
                description: None,
                category: "power tools".to_string(),
                sku: None,
                unit_cost: 52000,
                initial_stock: 1,
                min_stock: 0,
                reorder_point: 0,
                is_tool: true,
                next_maintenance_date: None,
            })
            .unwrap()
            .id;

        let now = Utc::now();
        let mut older = checkout_request("Dana");
        older.expected_return_date = Some(now - Duration::days(5));
        let mut newer = checkout_request("Riley");
        newer.expected_return_date = Some(now - Duration::days(1));

        tools.checkout_tool(b, newer).unwrap();
        tools.checkout_tool(a, older).unwrap();

        let overdue = tools.overdue_returns().unwrap();
        assert_eq!(overdue.len(), 2);
        assert_eq!(overdue[0].material_id, a);
        assert_eq!(overdue[1].material_id, b);
    }

    #[test]
    fn maintenance_due_respects_the_horizon() {
        let (ledger, tools) = setup();
        let today = Utc::now().date_naive();
        for (name, offset) in [("Soon", 5i64), ("Later", 45), ("Past", -2)] {
            ledger
                .create_material(NewMaterial {
                    name: name.to_string(),
                    description: None,
                    category: "power tools".to_string(),
                    sku: None,
                    unit_cost: 1000,
                    initial_stock: 1,
                    min_stock: 0,
                    reorder_point: 0,
                    is_tool: true,
                    next_maintenance_date: Some(today + Duration::days(offset)),
                })
                .unwrap();
        }

        let due = tools
            .tools_due_for_maintenance(DEFAULT_MAINTENANCE_HORIZON_DAYS)
            .unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].name, "Soon");
        assert_eq!(due[0].days_until_maintenance, 5);
    }
}
