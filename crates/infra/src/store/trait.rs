use std::sync::Arc;

use thiserror::Error;

use fieldstock_allocation::JobMaterial;
use fieldstock_core::{
    AssignmentId, ExpectedVersion, JobId, JobMaterialId, JobToolId, MaintenanceId, MaterialId,
};
use fieldstock_inventory::{Material, MaterialTransaction};
use fieldstock_tools::{JobTool, ToolAssignment, ToolMaintenance};

/// Row store failure.
///
/// `Unavailable` is the only transient kind: callers may retry reads freely,
/// but must not blindly retry writes on it, since a write may have partially
/// applied on the far side. Everything else is deterministic.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A conditional write found a different row version than expected.
    #[error("concurrency conflict: {0}")]
    Concurrency(String),

    /// An insert violated a uniqueness constraint.
    #[error("duplicate row: {0}")]
    Duplicate(String),

    /// The referenced row does not exist.
    #[error("row not found: {0}")]
    NotFound(String),

    /// A write was malformed (e.g. cross-referenced rows disagree).
    #[error("invalid write: {0}")]
    InvalidWrite(String),

    /// The backend could not be reached; safe to retry reads.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Non-transient backend failure.
    #[error("storage failure: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Transactional row store for the ledger's six row families.
///
/// ## Conditional writes
///
/// Materials carry a row version. Updates take the modified row (still
/// holding the version it was read at) plus an [`ExpectedVersion`]; the store
/// compares the expectation against the stored row, then persists with the
/// version bumped by one. Two writers racing from the same read leave exactly
/// one winner; the loser gets [`StoreError::Concurrency`].
///
/// ## Composite operations
///
/// `commit_stock_change`, `commit_checkout`, and `commit_checkin` pair a
/// conditional material update with its ledger/assignment row in ONE atomic
/// unit, so a balance can never drift from its audit trail and a status flip
/// can never be observed without its assignment (or vice versa).
///
/// ## Uniqueness
///
/// The store enforces at most one `active` assignment per material, one
/// allocation row per (job, material), and one `assigned` job tool per
/// (job, material); violating inserts fail with [`StoreError::Duplicate`].
pub trait LedgerStore: Send + Sync {
    // --- materials ---

    /// Insert a material, optionally together with a seeding transaction
    /// (initial stock purchase) in the same atomic unit.
    fn insert_material(
        &self,
        material: Material,
        seed: Option<MaterialTransaction>,
    ) -> Result<Material, StoreError>;

    fn material(&self, id: MaterialId) -> Result<Option<Material>, StoreError>;

    /// All materials (active and inactive), sorted by name.
    fn materials(&self) -> Result<Vec<Material>, StoreError>;

    fn update_material(
        &self,
        material: Material,
        expected: ExpectedVersion,
    ) -> Result<Material, StoreError>;

    /// Persist an updated balance and append its ledger entry atomically.
    fn commit_stock_change(
        &self,
        material: Material,
        expected: ExpectedVersion,
        transaction: MaterialTransaction,
    ) -> Result<(Material, MaterialTransaction), StoreError>;

    /// Ledger entries for one material, most recent first.
    fn transactions(&self, material_id: MaterialId) -> Result<Vec<MaterialTransaction>, StoreError>;

    // --- tool assignments ---

    /// Persist a checkout: the material's status flip and the new `active`
    /// assignment in one unit. Fails `Duplicate` if an active assignment
    /// already exists for the material.
    fn commit_checkout(
        &self,
        material: Material,
        expected: ExpectedVersion,
        assignment: ToolAssignment,
    ) -> Result<(Material, ToolAssignment), StoreError>;

    /// Persist a checkin: the material's status flip and the closed
    /// assignment in one unit.
    fn commit_checkin(
        &self,
        material: Material,
        expected: ExpectedVersion,
        assignment: ToolAssignment,
    ) -> Result<(Material, ToolAssignment), StoreError>;

    fn assignment(&self, id: AssignmentId) -> Result<Option<ToolAssignment>, StoreError>;

    /// All `active` assignments across materials.
    fn active_assignments(&self) -> Result<Vec<ToolAssignment>, StoreError>;

    /// Assignment history for one material, most recent first.
    fn assignments_for_material(
        &self,
        material_id: MaterialId,
    ) -> Result<Vec<ToolAssignment>, StoreError>;

    /// Whether this store can serve assignment history (utilization
    /// analytics). Stores that cannot must return `false` so the analytics
    /// layer reports "unavailable" instead of fabricating empty data.
    fn supports_assignment_history(&self) -> bool {
        true
    }

    // --- job materials ---

    /// Fails `Duplicate` if an allocation already exists for the
    /// (job, material) pair.
    fn insert_job_material(&self, job_material: JobMaterial) -> Result<JobMaterial, StoreError>;

    fn job_material(&self, id: JobMaterialId) -> Result<Option<JobMaterial>, StoreError>;

    fn find_job_material(
        &self,
        job_id: JobId,
        material_id: MaterialId,
    ) -> Result<Option<JobMaterial>, StoreError>;

    /// Allocations for one job, most recent first.
    fn job_materials_for_job(&self, job_id: JobId) -> Result<Vec<JobMaterial>, StoreError>;

    fn update_job_material(&self, job_material: JobMaterial) -> Result<JobMaterial, StoreError>;

    fn delete_job_material(&self, id: JobMaterialId) -> Result<(), StoreError>;

    // --- tool maintenance ---

    fn insert_maintenance(&self, event: ToolMaintenance) -> Result<ToolMaintenance, StoreError>;

    fn maintenance(&self, id: MaintenanceId) -> Result<Option<ToolMaintenance>, StoreError>;

    fn update_maintenance(&self, event: ToolMaintenance) -> Result<ToolMaintenance, StoreError>;

    // --- job tools ---

    /// Fails `Duplicate` if an `assigned` job tool already exists for the
    /// (job, material) pair.
    fn insert_job_tool(&self, job_tool: JobTool) -> Result<JobTool, StoreError>;

    fn job_tool(&self, id: JobToolId) -> Result<Option<JobTool>, StoreError>;

    fn update_job_tool(&self, job_tool: JobTool) -> Result<JobTool, StoreError>;

    /// Job tool rows for one job, most recent first.
    fn job_tools_for_job(&self, job_id: JobId) -> Result<Vec<JobTool>, StoreError>;
}

impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    fn insert_material(
        &self,
        material: Material,
        seed: Option<MaterialTransaction>,
    ) -> Result<Material, StoreError> {
        (**self).insert_material(material, seed)
    }

    fn material(&self, id: MaterialId) -> Result<Option<Material>, StoreError> {
        (**self).material(id)
    }

    fn materials(&self) -> Result<Vec<Material>, StoreError> {
        (**self).materials()
    }

    fn update_material(
        &self,
        material: Material,
        expected: ExpectedVersion,
    ) -> Result<Material, StoreError> {
        (**self).update_material(material, expected)
    }

    fn commit_stock_change(
        &self,
        material: Material,
        expected: ExpectedVersion,
        transaction: MaterialTransaction,
    ) -> Result<(Material, MaterialTransaction), StoreError> {
        (**self).commit_stock_change(material, expected, transaction)
    }

    fn transactions(&self, material_id: MaterialId) -> Result<Vec<MaterialTransaction>, StoreError> {
        (**self).transactions(material_id)
    }

    fn commit_checkout(
        &self,
        material: Material,
        expected: ExpectedVersion,
        assignment: ToolAssignment,
    ) -> Result<(Material, ToolAssignment), StoreError> {
        (**self).commit_checkout(material, expected, assignment)
    }

    fn commit_checkin(
        &self,
        material: Material,
        expected: ExpectedVersion,
        assignment: ToolAssignment,
    ) -> Result<(Material, ToolAssignment), StoreError> {
        (**self).commit_checkin(material, expected, assignment)
    }

    fn assignment(&self, id: AssignmentId) -> Result<Option<ToolAssignment>, StoreError> {
        (**self).assignment(id)
    }

    fn active_assignments(&self) -> Result<Vec<ToolAssignment>, StoreError> {
        (**self).active_assignments()
    }

    fn assignments_for_material(
        &self,
        material_id: MaterialId,
    ) -> Result<Vec<ToolAssignment>, StoreError> {
        (**self).assignments_for_material(material_id)
    }

    fn supports_assignment_history(&self) -> bool {
        (**self).supports_assignment_history()
    }

    fn insert_job_material(&self, job_material: JobMaterial) -> Result<JobMaterial, StoreError> {
        (**self).insert_job_material(job_material)
    }

    fn job_material(&self, id: JobMaterialId) -> Result<Option<JobMaterial>, StoreError> {
        (**self).job_material(id)
    }

    fn find_job_material(
        &self,
        job_id: JobId,
        material_id: MaterialId,
    ) -> Result<Option<JobMaterial>, StoreError> {
        (**self).find_job_material(job_id, material_id)
    }

    fn job_materials_for_job(&self, job_id: JobId) -> Result<Vec<JobMaterial>, StoreError> {
        (**self).job_materials_for_job(job_id)
    }

    fn update_job_material(&self, job_material: JobMaterial) -> Result<JobMaterial, StoreError> {
        (**self).update_job_material(job_material)
    }

    fn delete_job_material(&self, id: JobMaterialId) -> Result<(), StoreError> {
        (**self).delete_job_material(id)
    }

    fn insert_maintenance(&self, event: ToolMaintenance) -> Result<ToolMaintenance, StoreError> {
        (**self).insert_maintenance(event)
    }

    fn maintenance(&self, id: MaintenanceId) -> Result<Option<ToolMaintenance>, StoreError> {
        (**self).maintenance(id)
    }

    fn update_maintenance(&self, event: ToolMaintenance) -> Result<ToolMaintenance, StoreError> {
        (**self).update_maintenance(event)
    }

    fn insert_job_tool(&self, job_tool: JobTool) -> Result<JobTool, StoreError> {
        (**self).insert_job_tool(job_tool)
    }

    fn job_tool(&self, id: JobToolId) -> Result<Option<JobTool>, StoreError> {
        (**self).job_tool(id)
    }

    fn update_job_tool(&self, job_tool: JobTool) -> Result<JobTool, StoreError> {
        (**self).update_job_tool(job_tool)
    }

    fn job_tools_for_job(&self, job_id: JobId) -> Result<Vec<JobTool>, StoreError> {
        (**self).job_tools_for_job(job_id)
    }
}
