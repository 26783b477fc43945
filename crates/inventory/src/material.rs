use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use fieldstock_core::{DomainError, DomainResult, Entity, MaterialId};

/// Lifecycle status of a tool (materials with `is_tool = true`).
///
/// `available → assigned → available` is the normal checkout loop,
/// `available → maintenance → available` the service loop, and `retired`
/// is terminal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Available,
    Assigned,
    Maintenance,
    Retired,
}

/// A stockable item, possibly specialized as a tool.
///
/// `current_stock` is never negative; every change to it is audited by a
/// [`MaterialTransaction`](crate::MaterialTransaction). `version` backs
/// conditional writes in the store. Materials are soft-deleted
/// (`is_active = false`) so the transaction history keeps valid references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Material {
    pub id: MaterialId,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub sku: Option<String>,
    /// Cost per unit in smallest currency unit (e.g., cents).
    pub unit_cost: u64,
    pub current_stock: i64,
    pub min_stock: i64,
    pub reorder_point: i64,
    pub is_active: bool,
    pub is_tool: bool,
    /// `Some` exactly when `is_tool`.
    pub tool_status: Option<ToolStatus>,
    pub next_maintenance_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Monotonically increasing row version (optimistic concurrency).
    pub version: u64,
}

/// Fields accepted when creating a material.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewMaterial {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: String,
    #[serde(default)]
    pub sku: Option<String>,
    pub unit_cost: u64,
    #[serde(default)]
    pub initial_stock: i64,
    #[serde(default)]
    pub min_stock: i64,
    #[serde(default)]
    pub reorder_point: i64,
    #[serde(default)]
    pub is_tool: bool,
    #[serde(default)]
    pub next_maintenance_date: Option<NaiveDate>,
}

/// Partial update of non-stock material fields.
///
/// Stock and tool status are deliberately absent: balances change only
/// through ledger transactions, tool status only through the lifecycle
/// manager.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MaterialPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub sku: Option<String>,
    pub unit_cost: Option<u64>,
    pub min_stock: Option<i64>,
    pub reorder_point: Option<i64>,
    pub next_maintenance_date: Option<NaiveDate>,
}

impl Material {
    /// Validate and build a new material row.
    pub fn create(id: MaterialId, new: NewMaterial, now: DateTime<Utc>) -> DomainResult<Self> {
        if new.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if new.category.trim().is_empty() {
            return Err(DomainError::validation("category cannot be empty"));
        }
        if new.initial_stock < 0 {
            return Err(DomainError::validation("initial_stock cannot be negative"));
        }
        if new.min_stock < 0 || new.reorder_point < 0 {
            return Err(DomainError::validation(
                "min_stock and reorder_point cannot be negative",
            ));
        }

        Ok(Self {
            id,
            name: new.name,
            description: new.description,
            category: new.category,
            sku: new.sku,
            unit_cost: new.unit_cost,
            current_stock: new.initial_stock,
            min_stock: new.min_stock,
            reorder_point: new.reorder_point,
            is_active: true,
            is_tool: new.is_tool,
            tool_status: new.is_tool.then_some(ToolStatus::Available),
            next_maintenance_date: new.next_maintenance_date,
            created_at: now,
            updated_at: now,
            version: 0,
        })
    }

    /// Apply a non-stock field patch.
    pub fn apply_patch(&mut self, patch: MaterialPatch, now: DateTime<Utc>) -> DomainResult<()> {
        if let Some(name) = patch.name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("name cannot be empty"));
            }
            self.name = name;
        }
        if let Some(category) = patch.category {
            if category.trim().is_empty() {
                return Err(DomainError::validation("category cannot be empty"));
            }
            self.category = category;
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        if let Some(sku) = patch.sku {
            self.sku = Some(sku);
        }
        if let Some(unit_cost) = patch.unit_cost {
            self.unit_cost = unit_cost;
        }
        if let Some(min_stock) = patch.min_stock {
            if min_stock < 0 {
                return Err(DomainError::validation("min_stock cannot be negative"));
            }
            self.min_stock = min_stock;
        }
        if let Some(reorder_point) = patch.reorder_point {
            if reorder_point < 0 {
                return Err(DomainError::validation("reorder_point cannot be negative"));
            }
            self.reorder_point = reorder_point;
        }
        if let Some(date) = patch.next_maintenance_date {
            self.next_maintenance_date = Some(date);
        }
        self.updated_at = now;
        Ok(())
    }

    /// Soft delete. Calling this on an already-inactive material is a no-op.
    pub fn deactivate(&mut self, now: DateTime<Utc>) {
        if self.is_active {
            self.is_active = false;
            self.updated_at = now;
        }
    }

    /// Current tool status, or an error when the material is not a tool.
    pub fn require_tool_status(&self) -> DomainResult<ToolStatus> {
        if !self.is_tool {
            return Err(DomainError::invalid_operation(format!(
                "material '{}' is not a tool",
                self.name
            )));
        }
        // Tools always carry a status; treat a missing one as available
        // rather than failing a read path.
        Ok(self.tool_status.unwrap_or(ToolStatus::Available))
    }
}

impl Entity for Material {
    type Id = MaterialId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
