use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fieldstock_core::{DomainError, DomainResult, Entity, JobId, JobMaterialId, MaterialId};
use fieldstock_inventory::Material;

/// One material allocated to one job, with quantity and cost fixed at
/// allocation time.
///
/// `unit_cost` is a snapshot: later price changes on the material never
/// reprice an existing allocation. At most one row exists per
/// (job, material); repeated allocation attempts must update the existing
/// row instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMaterial {
    pub id: JobMaterialId,
    pub job_id: JobId,
    pub material_id: MaterialId,
    pub quantity_used: i64,
    /// Snapshot of the material's unit cost at allocation time (cents).
    pub unit_cost: u64,
    /// `quantity_used × unit_cost`, always from the snapshot cost.
    pub total_cost: u64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl JobMaterial {
    /// Decide an allocation against the material's current state.
    pub fn allocate(
        id: JobMaterialId,
        job_id: JobId,
        material: &Material,
        quantity_used: i64,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if !material.is_active {
            return Err(DomainError::invalid_operation(format!(
                "material '{}' is inactive",
                material.name
            )));
        }
        if quantity_used <= 0 {
            return Err(DomainError::validation("quantity_used must be positive"));
        }
        if material.current_stock < quantity_used {
            return Err(DomainError::InsufficientStock {
                available: material.current_stock,
                requested: quantity_used,
            });
        }

        Ok(Self {
            id,
            job_id,
            material_id: material.id,
            quantity_used,
            unit_cost: material.unit_cost,
            total_cost: quantity_used as u64 * material.unit_cost,
            notes,
            created_at: now,
        })
    }

    /// Change the allocated quantity, repricing from the ORIGINAL snapshot
    /// cost. Returns the signed stock delta the ledger must absorb (positive
    /// means more stock is consumed).
    pub fn change_quantity(&mut self, quantity_used: i64) -> DomainResult<i64> {
        if quantity_used <= 0 {
            return Err(DomainError::validation("quantity_used must be positive"));
        }
        let delta = quantity_used - self.quantity_used;
        self.quantity_used = quantity_used;
        self.total_cost = quantity_used as u64 * self.unit_cost;
        Ok(delta)
    }

    pub fn set_notes(&mut self, notes: Option<String>) {
        self.notes = notes;
    }
}

impl Entity for JobMaterial {
    type Id = JobMaterialId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
