use std::collections::HashMap;
use std::sync::RwLock;

use fieldstock_allocation::JobMaterial;
use fieldstock_core::{
    AssignmentId, ExpectedVersion, JobId, JobMaterialId, JobToolId, MaintenanceId, MaterialId,
};
use fieldstock_inventory::{Material, MaterialTransaction};
use fieldstock_tools::{AssignmentStatus, JobTool, JobToolStatus, ToolAssignment, ToolMaintenance};

use super::r#trait::{LedgerStore, StoreError};

#[derive(Debug, Default)]
struct Tables {
    materials: HashMap<MaterialId, Material>,
    transactions: Vec<MaterialTransaction>,
    assignments: HashMap<AssignmentId, ToolAssignment>,
    job_materials: HashMap<JobMaterialId, JobMaterial>,
    maintenance: HashMap<MaintenanceId, ToolMaintenance>,
    job_tools: HashMap<JobToolId, JobTool>,
}

/// In-memory ledger store.
///
/// Intended for tests/dev. All six row families live under one lock, which
/// makes the composite operations trivially atomic: either every row of a
/// commit lands or none does.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    tables: RwLock<Tables>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }

    /// Conditional material write: expectation is checked against the stored
    /// row and the version bumped on success.
    fn apply_material_update(
        tables: &mut Tables,
        mut material: Material,
        expected: ExpectedVersion,
    ) -> Result<Material, StoreError> {
        let stored = tables
            .materials
            .get(&material.id)
            .ok_or_else(|| StoreError::NotFound(format!("material {}", material.id)))?;
        if !expected.matches(stored.version) {
            return Err(StoreError::Concurrency(format!(
                "material {}: expected {expected:?}, found {}",
                material.id, stored.version
            )));
        }
        material.version = stored.version + 1;
        tables.materials.insert(material.id, material.clone());
        Ok(material)
    }

    fn has_active_assignment(tables: &Tables, material_id: MaterialId) -> bool {
        tables
            .assignments
            .values()
            .any(|a| a.material_id == material_id && a.status == AssignmentStatus::Active)
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn insert_material(
        &self,
        material: Material,
        seed: Option<MaterialTransaction>,
    ) -> Result<Material, StoreError> {
        let mut tables = self.write()?;
        if tables.materials.contains_key(&material.id) {
            return Err(StoreError::Duplicate(format!("material {}", material.id)));
        }
        if let Some(seed) = &seed {
            if seed.material_id != material.id {
                return Err(StoreError::InvalidWrite(
                    "seed transaction references a different material".to_string(),
                ));
            }
        }
        tables.materials.insert(material.id, material.clone());
        if let Some(seed) = seed {
            tables.transactions.push(seed);
        }
        Ok(material)
    }

    fn material(&self, id: MaterialId) -> Result<Option<Material>, StoreError> {
        Ok(self.read()?.materials.get(&id).cloned())
    }

    fn materials(&self) -> Result<Vec<Material>, StoreError> {
        let mut all: Vec<Material> = self.read()?.materials.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    fn update_material(
        &self,
        material: Material,
        expected: ExpectedVersion,
    ) -> Result<Material, StoreError> {
        let mut tables = self.write()?;
        Self::apply_material_update(&mut tables, material, expected)
    }

    fn commit_stock_change(
        &self,
        material: Material,
        expected: ExpectedVersion,
        transaction: MaterialTransaction,
    ) -> Result<(Material, MaterialTransaction), StoreError> {
        if transaction.material_id != material.id {
            return Err(StoreError::InvalidWrite(
                "transaction references a different material".to_string(),
            ));
        }
        if transaction.new_stock != material.current_stock {
            return Err(StoreError::InvalidWrite(format!(
                "transaction new_stock {} disagrees with balance {}",
                transaction.new_stock, material.current_stock
            )));
        }
        let mut tables = self.write()?;
        let material = Self::apply_material_update(&mut tables, material, expected)?;
        tables.transactions.push(transaction.clone());
        Ok((material, transaction))
    }

    fn transactions(&self, material_id: MaterialId) -> Result<Vec<MaterialTransaction>, StoreError> {
        // Push order is recording order; most recent first.
        Ok(self
            .read()?
            .transactions
            .iter()
            .filter(|t| t.material_id == material_id)
            .rev()
            .cloned()
            .collect())
    }

    fn commit_checkout(
        &self,
        material: Material,
        expected: ExpectedVersion,
        assignment: ToolAssignment,
    ) -> Result<(Material, ToolAssignment), StoreError> {
        if assignment.material_id != material.id {
            return Err(StoreError::InvalidWrite(
                "assignment references a different material".to_string(),
            ));
        }
        let mut tables = self.write()?;
        if Self::has_active_assignment(&tables, material.id) {
            return Err(StoreError::Duplicate(format!(
                "material {} already has an active assignment",
                material.id
            )));
        }
        if tables.assignments.contains_key(&assignment.id) {
            return Err(StoreError::Duplicate(format!("assignment {}", assignment.id)));
        }
        let material = Self::apply_material_update(&mut tables, material, expected)?;
        tables.assignments.insert(assignment.id, assignment.clone());
        Ok((material, assignment))
    }

    fn commit_checkin(
        &self,
        material: Material,
        expected: ExpectedVersion,
        assignment: ToolAssignment,
    ) -> Result<(Material, ToolAssignment), StoreError> {
        let mut tables = self.write()?;
        if !tables.assignments.contains_key(&assignment.id) {
            return Err(StoreError::NotFound(format!("assignment {}", assignment.id)));
        }
        let material = Self::apply_material_update(&mut tables, material, expected)?;
        tables.assignments.insert(assignment.id, assignment.clone());
        Ok((material, assignment))
    }

    fn assignment(&self, id: AssignmentId) -> Result<Option<ToolAssignment>, StoreError> {
        Ok(self.read()?.assignments.get(&id).cloned())
    }

    fn active_assignments(&self) -> Result<Vec<ToolAssignment>, StoreError> {
        Ok(self
            .read()?
            .assignments
            .values()
            .filter(|a| a.status == AssignmentStatus::Active)
            .cloned()
            .collect())
    }

    fn assignments_for_material(
        &self,
        material_id: MaterialId,
    ) -> Result<Vec<ToolAssignment>, StoreError> {
        let mut rows: Vec<ToolAssignment> = self
            .read()?
            .assignments
            .values()
            .filter(|a| a.material_id == material_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.assigned_date.cmp(&a.assigned_date));
        Ok(rows)
    }

    fn insert_job_material(&self, job_material: JobMaterial) -> Result<JobMaterial, StoreError> {
        let mut tables = self.write()?;
        if tables.job_materials.contains_key(&job_material.id) {
            return Err(StoreError::Duplicate(format!("job material {}", job_material.id)));
        }
        let pair_taken = tables.job_materials.values().any(|jm| {
            jm.job_id == job_material.job_id && jm.material_id == job_material.material_id
        });
        if pair_taken {
            return Err(StoreError::Duplicate(format!(
                "material {} is already allocated to job {}",
                job_material.material_id, job_material.job_id
            )));
        }
        tables.job_materials.insert(job_material.id, job_material.clone());
        Ok(job_material)
    }

    fn job_material(&self, id: JobMaterialId) -> Result<Option<JobMaterial>, StoreError> {
        Ok(self.read()?.job_materials.get(&id).cloned())
    }

    fn find_job_material(
        &self,
        job_id: JobId,
        material_id: MaterialId,
    ) -> Result<Option<JobMaterial>, StoreError> {
        Ok(self
            .read()?
            .job_materials
            .values()
            .find(|jm| jm.job_id == job_id && jm.material_id == material_id)
            .cloned())
    }

    fn job_materials_for_job(&self, job_id: JobId) -> Result<Vec<JobMaterial>, StoreError> {
        let mut rows: Vec<JobMaterial> = self
            .read()?
            .job_materials
            .values()
            .filter(|jm| jm.job_id == job_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    fn update_job_material(&self, job_material: JobMaterial) -> Result<JobMaterial, StoreError> {
        let mut tables = self.write()?;
        if !tables.job_materials.contains_key(&job_material.id) {
            return Err(StoreError::NotFound(format!("job material {}", job_material.id)));
        }
        tables.job_materials.insert(job_material.id, job_material.clone());
        Ok(job_material)
    }

    fn delete_job_material(&self, id: JobMaterialId) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        tables
            .job_materials
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("job material {id}")))
    }

    fn insert_maintenance(&self, event: ToolMaintenance) -> Result<ToolMaintenance, StoreError> {
        let mut tables = self.write()?;
        if tables.maintenance.contains_key(&event.id) {
            return Err(StoreError::Duplicate(format!("maintenance {}", event.id)));
        }
        tables.maintenance.insert(event.id, event.clone());
        Ok(event)
    }

    fn maintenance(&self, id: MaintenanceId) -> Result<Option<ToolMaintenance>, StoreError> {
        Ok(self.read()?.maintenance.get(&id).cloned())
    }

    fn update_maintenance(&self, event: ToolMaintenance) -> Result<ToolMaintenance, StoreError> {
        let mut tables = self.write()?;
        if !tables.maintenance.contains_key(&event.id) {
            return Err(StoreError::NotFound(format!("maintenance {}", event.id)));
        }
        tables.maintenance.insert(event.id, event.clone());
        Ok(event)
    }

    fn insert_job_tool(&self, job_tool: JobTool) -> Result<JobTool, StoreError> {
        let mut tables = self.write()?;
        if tables.job_tools.contains_key(&job_tool.id) {
            return Err(StoreError::Duplicate(format!("job tool {}", job_tool.id)));
        }
        let pair_assigned = tables.job_tools.values().any(|jt| {
            jt.job_id == job_tool.job_id
                && jt.material_id == job_tool.material_id
                && jt.status == JobToolStatus::Assigned
        });
        if pair_assigned {
            return Err(StoreError::Duplicate(format!(
                "tool {} is already assigned to job {}",
                job_tool.material_id, job_tool.job_id
            )));
        }
        tables.job_tools.insert(job_tool.id, job_tool.clone());
        Ok(job_tool)
    }

    fn job_tool(&self, id: JobToolId) -> Result<Option<JobTool>, StoreError> {
        Ok(self.read()?.job_tools.get(&id).cloned())
    }

    fn update_job_tool(&self, job_tool: JobTool) -> Result<JobTool, StoreError> {
        let mut tables = self.write()?;
        if !tables.job_tools.contains_key(&job_tool.id) {
            return Err(StoreError::NotFound(format!("job tool {}", job_tool.id)));
        }
        tables.job_tools.insert(job_tool.id, job_tool.clone());
        Ok(job_tool)
    }

    fn job_tools_for_job(&self, job_id: JobId) -> Result<Vec<JobTool>, StoreError> {
        let mut rows: Vec<JobTool> = self
            .read()?
            .job_tools
            .values()
            .filter(|jt| jt.job_id == job_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.assigned_date.cmp(&a.assigned_date));
        Ok(rows)
    }
}
