//! Job material allocation: cost snapshots plus immediate stock consumption.

use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument, warn};

use fieldstock_allocation::JobMaterial;
use fieldstock_core::{DomainError, JobId, JobMaterialId, MaterialId};
use fieldstock_inventory::TransactionType;

use crate::store::{LedgerStore, StoreError};

use super::{LedgerError, LedgerResult, StockLedger};

/// An allocation joined with a snapshot of its material row, for display.
#[derive(Debug, Clone, Serialize)]
pub struct JobMaterialWithMaterial {
    #[serde(flatten)]
    pub job_material: JobMaterial,
    pub material_name: String,
    pub material_category: String,
    pub material_sku: Option<String>,
}

/// Service for allocating materials to jobs.
///
/// An allocation consumes stock the moment it is created: the `usage` ledger
/// entry and the allocation row reference the same quantity, and quantity
/// edits or removal flow compensating entries so ledger and allocations never
/// drift apart.
#[derive(Debug, Clone)]
pub struct JobMaterialAllocator<S> {
    ledger: StockLedger<S>,
}

impl<S: LedgerStore + Clone> JobMaterialAllocator<S> {
    pub fn new(store: S) -> Self {
        Self {
            ledger: StockLedger::new(store),
        }
    }

    fn store(&self) -> &S {
        self.ledger.store()
    }

    /// Allocate a quantity of a material to a job.
    ///
    /// The unit cost is snapshotted at allocation time; later price changes
    /// never reprice an existing allocation. One allocation per
    /// (job, material) pair; a concurrent duplicate loses at the store's
    /// uniqueness check and its stock decrement is compensated.
    #[instrument(skip(self, notes), err)]
    pub fn add_material_to_job(
        &self,
        job_id: JobId,
        material_id: MaterialId,
        quantity_used: i64,
        notes: Option<String>,
    ) -> LedgerResult<JobMaterial> {
        let material = self.ledger.material(material_id)?;
        if self.store().find_job_material(job_id, material_id)?.is_some() {
            return Err(DomainError::duplicate_allocation(format!(
                "material '{}' is already allocated to job {job_id}",
                material.name
            ))
            .into());
        }

        let allocation = JobMaterial::allocate(
            JobMaterialId::new(),
            job_id,
            &material,
            quantity_used,
            notes,
            Utc::now(),
        )?;

        self.ledger.record_transaction(
            material_id,
            TransactionType::Usage,
            -quantity_used,
            Some(allocation.unit_cost),
            Some(format!("allocated to job {job_id}")),
        )?;

        match self.store().insert_job_material(allocation) {
            Ok(allocation) => {
                info!(job_id = %job_id, material_id = %material_id, "material allocated");
                Ok(allocation)
            }
            Err(e) => {
                // The usage entry already committed; put the stock back
                // before surfacing the failure, whatever its kind.
                warn!(job_id = %job_id, material_id = %material_id, error = %e, "allocation insert failed, compensating");
                self.ledger.record_transaction(
                    material_id,
                    TransactionType::Return,
                    quantity_used,
                    Some(material.unit_cost),
                    Some(format!("failed allocation to job {job_id} reversed")),
                )?;
                match e {
                    StoreError::Duplicate(msg) => {
                        Err(DomainError::duplicate_allocation(msg).into())
                    }
                    other => Err(other.into()),
                }
            }
        }
    }

    /// Edit an allocation's quantity and/or notes.
    ///
    /// The total is recomputed from the original snapshot cost. A quantity
    /// change flows through the ledger: an increase records extra `usage`,
    /// a decrease records a `return`.
    #[instrument(skip(self, notes), err)]
    pub fn update_job_material(
        &self,
        id: JobMaterialId,
        quantity_used: Option<i64>,
        notes: Option<String>,
    ) -> LedgerResult<JobMaterial> {
        let mut allocation = self
            .store()
            .job_material(id)?
            .ok_or_else(|| DomainError::not_found(format!("job material {id}")))?;

        if let Some(quantity) = quantity_used {
            let delta = allocation.change_quantity(quantity)?;
            if delta != 0 {
                let (transaction_type, label) = if delta > 0 {
                    (TransactionType::Usage, "increased")
                } else {
                    (TransactionType::Return, "reduced")
                };
                self.ledger.record_transaction(
                    allocation.material_id,
                    transaction_type,
                    -delta,
                    Some(allocation.unit_cost),
                    Some(format!("allocation to job {} {label}", allocation.job_id)),
                )?;
            }
        }
        if let Some(notes) = notes {
            allocation.set_notes(Some(notes));
        }

        Ok(self.store().update_job_material(allocation)?)
    }

    /// Remove an allocation and restock its quantity via a `return` entry.
    #[instrument(skip(self), err)]
    pub fn remove_material_from_job(&self, id: JobMaterialId) -> LedgerResult<()> {
        let allocation = self
            .store()
            .job_material(id)?
            .ok_or_else(|| DomainError::not_found(format!("job material {id}")))?;

        self.ledger.record_transaction(
            allocation.material_id,
            TransactionType::Return,
            allocation.quantity_used,
            Some(allocation.unit_cost),
            Some(format!("allocation to job {} removed", allocation.job_id)),
        )?;
        self.store().delete_job_material(id)?;
        info!(job_material_id = %id, "allocation removed and restocked");
        Ok(())
    }

    /// Allocations for one job with material snapshots, most recent first.
    pub fn job_materials(&self, job_id: JobId) -> LedgerResult<Vec<JobMaterialWithMaterial>> {
        let allocations = self.store().job_materials_for_job(job_id)?;
        allocations
            .into_iter()
            .map(|job_material| {
                let material = self.ledger.material(job_material.material_id)?;
                Ok(JobMaterialWithMaterial {
                    job_material,
                    material_name: material.name,
                    material_category: material.category,
                    material_sku: material.sku,
                })
            })
            .collect()
    }
}
