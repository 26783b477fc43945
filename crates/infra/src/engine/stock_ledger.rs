//! Stock ledger service: material CRUD and the uniform balance-change path.

use chrono::Utc;
use tracing::{debug, info, instrument};

use fieldstock_core::{
    DomainError, ExpectedVersion, MaterialId, TransactionId,
};
use fieldstock_inventory::{
    classify_stock, summarize, InventorySummary, Material, MaterialPatch, MaterialTransaction,
    NewMaterial, StockAlert, TransactionType,
};

use crate::store::{LedgerStore, StoreError};

use super::{LedgerError, LedgerResult};

/// Service for material lifecycle and stock balance changes.
///
/// Every balance change, `usage` included, flows through
/// [`StockLedger::record_transaction`] so the ledger stays the source of
/// truth for the balance. A version conflict against a concurrent writer is
/// retried once against the fresh row before surfacing.
#[derive(Debug, Clone)]
pub struct StockLedger<S> {
    store: S,
}

impl<S: LedgerStore> StockLedger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying store, for sibling services that share it.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Create a material. A positive initial stock is seeded through a
    /// `purchase` ledger entry persisted atomically with the row, so the
    /// ledger explains the opening balance.
    #[instrument(skip(self, new), fields(name = %new.name), err)]
    pub fn create_material(&self, new: NewMaterial) -> LedgerResult<Material> {
        let now = Utc::now();
        let material = Material::create(MaterialId::new(), new, now)?;

        let seed = if material.current_stock > 0 {
            let mut opening = material.clone();
            opening.current_stock = 0;
            Some(MaterialTransaction::record(
                TransactionId::new(),
                &opening,
                TransactionType::Purchase,
                material.current_stock,
                Some(material.unit_cost),
                Some("initial stock".to_string()),
                now,
            )?)
        } else {
            None
        };

        let material = self.store.insert_material(material, seed)?;
        info!(material_id = %material.id, "material created");
        Ok(material)
    }

    pub fn material(&self, id: MaterialId) -> LedgerResult<Material> {
        self.store
            .material(id)?
            .ok_or_else(|| DomainError::not_found(format!("material {id}")).into())
    }

    pub fn materials(&self) -> LedgerResult<Vec<Material>> {
        Ok(self.store.materials()?)
    }

    /// Patch non-stock fields. The balance is never patched directly; stock
    /// changes go through [`Self::record_transaction`].
    #[instrument(skip(self, patch), err)]
    pub fn update_material(&self, id: MaterialId, patch: MaterialPatch) -> LedgerResult<Material> {
        let mut material = self.material(id)?;
        let read_version = material.version;
        material.apply_patch(patch, Utc::now())?;
        let material = self
            .store
            .update_material(material, ExpectedVersion::Exact(read_version))?;
        Ok(material)
    }

    /// Soft delete. Idempotent: deactivating an inactive material succeeds
    /// without a write.
    #[instrument(skip(self), err)]
    pub fn delete_material(&self, id: MaterialId) -> LedgerResult<Material> {
        let mut material = self.material(id)?;
        if !material.is_active {
            return Ok(material);
        }
        let read_version = material.version;
        material.deactivate(Utc::now());
        let material = self
            .store
            .update_material(material, ExpectedVersion::Exact(read_version))?;
        info!(material_id = %id, "material deactivated");
        Ok(material)
    }

    /// The single path for every balance change.
    ///
    /// Loads the material, computes the ledger entry, and commits balance
    /// plus entry in one conditional store operation. A lost race against a
    /// concurrent writer is retried once against the re-read row.
    #[instrument(skip(self, notes), fields(kind = %transaction_type), err)]
    pub fn record_transaction(
        &self,
        material_id: MaterialId,
        transaction_type: TransactionType,
        quantity: i64,
        unit_cost: Option<u64>,
        notes: Option<String>,
    ) -> LedgerResult<(Material, MaterialTransaction)> {
        match self.try_record(material_id, transaction_type, quantity, unit_cost, notes.clone()) {
            Err(LedgerError::Store(StoreError::Concurrency(_))) => {
                debug!(material_id = %material_id, "version conflict, retrying once");
                self.try_record(material_id, transaction_type, quantity, unit_cost, notes)
            }
            other => other,
        }
    }

    fn try_record(
        &self,
        material_id: MaterialId,
        transaction_type: TransactionType,
        quantity: i64,
        unit_cost: Option<u64>,
        notes: Option<String>,
    ) -> LedgerResult<(Material, MaterialTransaction)> {
        let mut material = self.material(material_id)?;
        let read_version = material.version;
        let now = Utc::now();
        let transaction = MaterialTransaction::record(
            TransactionId::new(),
            &material,
            transaction_type,
            quantity,
            unit_cost,
            notes,
            now,
        )?;
        material.current_stock = transaction.new_stock;
        material.updated_at = now;
        let (material, transaction) = self.store.commit_stock_change(
            material,
            ExpectedVersion::Exact(read_version),
            transaction,
        )?;
        Ok((material, transaction))
    }

    /// Manual correction: an `adjustment` entry with a signed delta.
    pub fn adjust_stock(
        &self,
        material_id: MaterialId,
        delta: i64,
        reason: String,
        unit_cost: Option<u64>,
    ) -> LedgerResult<(Material, MaterialTransaction)> {
        self.record_transaction(
            material_id,
            TransactionType::Adjustment,
            delta,
            unit_cost,
            Some(reason),
        )
    }

    /// Ledger history for one material, most recent first.
    pub fn transactions(&self, material_id: MaterialId) -> LedgerResult<Vec<MaterialTransaction>> {
        // Surface NotFound for unknown materials rather than an empty list.
        self.material(material_id)?;
        Ok(self.store.transactions(material_id)?)
    }

    /// Rollup over active materials.
    pub fn inventory_summary(&self) -> LedgerResult<InventorySummary> {
        let materials = self.store.materials()?;
        Ok(summarize(materials.iter().filter(|m| m.is_active)))
    }

    /// Threshold alerts over active materials, in store (name) order.
    pub fn stock_alerts(&self) -> LedgerResult<Vec<StockAlert>> {
        let materials = self.store.materials()?;
        Ok(materials
            .iter()
            .filter(|m| m.is_active)
            .filter_map(classify_stock)
            .collect())
    }
}
