//! Read-side rollups over materials and assignment history.

use std::collections::BTreeSet;

use serde::Serialize;

use fieldstock_core::MaterialId;
use fieldstock_tools::AssignmentStatus;

use crate::store::LedgerStore;

use super::LedgerResult;

/// Utilization figures for one tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolUtilization {
    pub material_id: MaterialId,
    pub name: String,
    pub category: String,
    pub total_assignments: usize,
    pub active_assignments: usize,
    /// active / total, 0.0 for never-assigned tools.
    pub utilization_rate: f64,
}

/// Utilization is only meaningful when the store keeps assignment history.
/// A store without it gets an explicit marker, not an empty report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "tools", rename_all = "snake_case")]
pub enum ToolUtilizationReport {
    Available(Vec<ToolUtilization>),
    Unavailable,
}

#[derive(Debug, Clone)]
pub struct InventoryAnalytics<S> {
    store: S,
}

impl<S: LedgerStore> InventoryAnalytics<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Distinct categories across active materials, sorted.
    pub fn material_categories(&self) -> LedgerResult<Vec<String>> {
        let materials = self.store.materials()?;
        let categories: BTreeSet<String> = materials
            .into_iter()
            .filter(|m| m.is_active)
            .map(|m| m.category)
            .collect();
        Ok(categories.into_iter().collect())
    }

    /// Per-tool assignment counts over active tools, in name order.
    pub fn tool_utilization(&self) -> LedgerResult<ToolUtilizationReport> {
        if !self.store.supports_assignment_history() {
            return Ok(ToolUtilizationReport::Unavailable);
        }

        let materials = self.store.materials()?;
        let mut report = Vec::new();
        for material in materials.iter().filter(|m| m.is_tool && m.is_active) {
            let history = self.store.assignments_for_material(material.id)?;
            let total = history.len();
            let active = history
                .iter()
                .filter(|a| a.status == AssignmentStatus::Active)
                .count();
            let rate = if total == 0 {
                0.0
            } else {
                active as f64 / total as f64
            };
            report.push(ToolUtilization {
                material_id: material.id,
                name: material.name.clone(),
                category: material.category.clone(),
                total_assignments: total,
                active_assignments: active,
                utilization_rate: rate,
            });
        }
        Ok(ToolUtilizationReport::Available(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{StockLedger, ToolLifecycleManager};
    use crate::store::{InMemoryLedgerStore, StoreError};
    use fieldstock_allocation::JobMaterial;
    use fieldstock_core::{
        AssignmentId, ExpectedVersion, JobId, JobMaterialId, JobToolId, MaintenanceId,
    };
    use fieldstock_inventory::{Material, MaterialTransaction, NewMaterial};
    use fieldstock_tools::{CheckoutRequest, JobTool, ToolAssignment, ToolMaintenance};
    use std::sync::Arc;

    fn new_material(name: &str, category: &str, is_tool: bool) -> NewMaterial {
        NewMaterial {
            name: name.to_string(),
            description: None,
            category: category.to_string(),
            sku: None,
            unit_cost: 100,
            initial_stock: 1,
            min_stock: 0,
            reorder_point: 0,
            is_tool,
            next_maintenance_date: None,
        }
    }

    #[test]
    fn categories_are_distinct_sorted_and_skip_inactive() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let ledger = StockLedger::new(store.clone());
        ledger.create_material(new_material("Pipe", "plumbing", false)).unwrap();
        ledger.create_material(new_material("Elbow", "plumbing", false)).unwrap();
        ledger.create_material(new_material("Cable", "electrical", false)).unwrap();
        let gone = ledger
            .create_material(new_material("Shingle", "roofing", false))
            .unwrap();
        ledger.delete_material(gone.id).unwrap();

        let analytics = InventoryAnalytics::new(store);
        assert_eq!(
            analytics.material_categories().unwrap(),
            vec!["electrical".to_string(), "plumbing".to_string()]
        );
    }

    #[test]
    fn utilization_counts_active_and_total_assignments() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let ledger = StockLedger::new(store.clone());
        let tools = ToolLifecycleManager::new(store.clone());
        let tool = ledger
            .create_material(new_material("Drill", "power tools", true))
            .unwrap();

        let request = |name: &str| CheckoutRequest {
            assigned_to_name: name.to_string(),
            expected_return_date: None,
            job_id: None,
            notes: None,
            condition_at_assignment: None,
        };
        let first = tools.checkout_tool(tool.id, request("Dana")).unwrap();
        tools.checkin_tool(first.id, None, None).unwrap();
        tools.checkout_tool(tool.id, request("Riley")).unwrap();

        let analytics = InventoryAnalytics::new(store);
        match analytics.tool_utilization().unwrap() {
            ToolUtilizationReport::Available(report) => {
                assert_eq!(report.len(), 1);
                assert_eq!(report[0].total_assignments, 2);
                assert_eq!(report[0].active_assignments, 1);
                assert!((report[0].utilization_rate - 0.5).abs() < f64::EPSILON);
            }
            ToolUtilizationReport::Unavailable => panic!("expected an available report"),
        }
    }

    #[test]
    fn never_assigned_tool_reports_zero_rate() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let ledger = StockLedger::new(store.clone());
        ledger
            .create_material(new_material("Ladder", "access", true))
            .unwrap();

        let analytics = InventoryAnalytics::new(store);
        match analytics.tool_utilization().unwrap() {
            ToolUtilizationReport::Available(report) => {
                assert_eq!(report[0].total_assignments, 0);
                assert_eq!(report[0].utilization_rate, 0.0);
            }
            ToolUtilizationReport::Unavailable => panic!("expected an available report"),
        }
    }

    /// A store that keeps balances but discards assignment history.
    #[derive(Clone)]
    struct NoHistoryStore(Arc<InMemoryLedgerStore>);

    impl LedgerStore for NoHistoryStore {
        fn insert_material(
            &self,
            material: Material,
            seed: Option<MaterialTransaction>,
        ) -> Result<Material, StoreError> {
            self.0.insert_material(material, seed)
        }
        fn material(&self, id: MaterialId) -> Result<Option<Material>, StoreError> {
            self.0.material(id)
        }
        fn materials(&self) -> Result<Vec<Material>, StoreError> {
            self.0.materials()
        }
        fn update_material(
            &self,
            material: Material,
            expected: ExpectedVersion,
        ) -> Result<Material, StoreError> {
            self.0.update_material(material, expected)
        }
        fn commit_stock_change(
            &self,
            material: Material,
            expected: ExpectedVersion,
            transaction: MaterialTransaction,
        ) -> Result<(Material, MaterialTransaction), StoreError> {
            self.0.commit_stock_change(material, expected, transaction)
        }
        fn transactions(
            &self,
            material_id: MaterialId,
        ) -> Result<Vec<MaterialTransaction>, StoreError> {
            self.0.transactions(material_id)
        }
        fn commit_checkout(
            &self,
            material: Material,
            expected: ExpectedVersion,
            assignment: ToolAssignment,
        ) -> Result<(Material, ToolAssignment), StoreError> {
            self.0.commit_checkout(material, expected, assignment)
        }
        fn commit_checkin(
            &self,
            material: Material,
            expected: ExpectedVersion,
            assignment: ToolAssignment,
        ) -> Result<(Material, ToolAssignment), StoreError> {
            self.0.commit_checkin(material, expected, assignment)
        }
        fn assignment(&self, id: AssignmentId) -> Result<Option<ToolAssignment>, StoreError> {
            self.0.assignment(id)
        }
        fn active_assignments(&self) -> Result<Vec<ToolAssignment>, StoreError> {
            self.0.active_assignments()
        }
        fn assignments_for_material(
            &self,
            material_id: MaterialId,
        ) -> Result<Vec<ToolAssignment>, StoreError> {
            self.0.assignments_for_material(material_id)
        }
        fn supports_assignment_history(&self) -> bool {
            false
        }
        fn insert_job_material(
            &self,
            job_material: JobMaterial,
        ) -> Result<JobMaterial, StoreError> {
            self.0.insert_job_material(job_material)
        }
        fn job_material(&self, id: JobMaterialId) -> Result<Option<JobMaterial>, StoreError> {
            self.0.job_material(id)
        }
        fn find_job_material(
            &self,
            job_id: JobId,
            material_id: MaterialId,
        ) -> Result<Option<JobMaterial>, StoreError> {
            self.0.find_job_material(job_id, material_id)
        }
        fn job_materials_for_job(&self, job_id: JobId) -> Result<Vec<JobMaterial>, StoreError> {
            self.0.job_materials_for_job(job_id)
        }
        fn update_job_material(
            &self,
            job_material: JobMaterial,
        ) -> Result<JobMaterial, StoreError> {
            self.0.update_job_material(job_material)
        }
        fn delete_job_material(&self, id: JobMaterialId) -> Result<(), StoreError> {
            self.0.delete_job_material(id)
        }
        fn insert_maintenance(
            &self,
            event: ToolMaintenance,
        ) -> Result<ToolMaintenance, StoreError> {
            self.0.insert_maintenance(event)
        }
        fn maintenance(&self, id: MaintenanceId) -> Result<Option<ToolMaintenance>, StoreError> {
            self.0.maintenance(id)
        }
        fn update_maintenance(
            &self,
            event: ToolMaintenance,
        ) -> Result<ToolMaintenance, StoreError> {
            self.0.update_maintenance(event)
        }
        fn insert_job_tool(&self, job_tool: JobTool) -> Result<JobTool, StoreError> {
            self.0.insert_job_tool(job_tool)
        }
        fn job_tool(&self, id: JobToolId) -> Result<Option<JobTool>, StoreError> {
            self.0.job_tool(id)
        }
        fn update_job_tool(&self, job_tool: JobTool) -> Result<JobTool, StoreError> {
            self.0.update_job_tool(job_tool)
        }
        fn job_tools_for_job(&self, job_id: JobId) -> Result<Vec<JobTool>, StoreError> {
            self.0.job_tools_for_job(job_id)
        }
    }

    #[test]
    fn missing_history_capability_yields_an_explicit_marker() {
        let store = NoHistoryStore(Arc::new(InMemoryLedgerStore::new()));
        let ledger = StockLedger::new(store.clone());
        ledger
            .create_material(new_material("Drill", "power tools", true))
            .unwrap();

        let analytics = InventoryAnalytics::new(store);
        assert_eq!(
            analytics.tool_utilization().unwrap(),
            ToolUtilizationReport::Unavailable
        );
    }
}
