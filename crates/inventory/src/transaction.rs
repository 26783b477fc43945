use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fieldstock_core::{DomainError, DomainResult, MaterialId, TransactionId};

use crate::material::Material;

/// Kind of balance change a ledger entry records.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Purchase,
    Usage,
    Return,
    Adjustment,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Purchase => "purchase",
            TransactionType::Usage => "usage",
            TransactionType::Return => "return",
            TransactionType::Adjustment => "adjustment",
        }
    }
}

impl core::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only ledger entry auditing one balance change.
///
/// `new_stock == previous_stock + quantity` holds at recording time, and
/// `new_stock` equals the material's `current_stock` immediately after the
/// paired balance write. Entries are immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialTransaction {
    pub id: TransactionId,
    pub material_id: MaterialId,
    pub transaction_type: TransactionType,
    /// Signed: purchases/returns positive, usage negative, adjustments either.
    pub quantity: i64,
    pub unit_cost: Option<u64>,
    /// Derived: `|quantity| × unit_cost` when a unit cost is known.
    pub total_cost: Option<u64>,
    pub previous_stock: i64,
    pub new_stock: i64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl MaterialTransaction {
    /// Compute the ledger entry for a balance change on `material`.
    ///
    /// This is the single path every stock change takes, `usage` included.
    /// The caller persists the returned entry together with the updated
    /// balance (`new_stock`) in one atomic store operation.
    pub fn record(
        id: TransactionId,
        material: &Material,
        transaction_type: TransactionType,
        quantity: i64,
        unit_cost: Option<u64>,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if !material.is_active {
            return Err(DomainError::invalid_operation(format!(
                "material '{}' is inactive",
                material.name
            )));
        }
        if quantity == 0 {
            return Err(DomainError::validation("quantity cannot be zero"));
        }
        match transaction_type {
            TransactionType::Purchase | TransactionType::Return if quantity < 0 => {
                return Err(DomainError::validation(format!(
                    "{transaction_type} quantity must be positive"
                )));
            }
            TransactionType::Usage if quantity > 0 => {
                return Err(DomainError::validation("usage quantity must be negative"));
            }
            _ => {}
        }

        let previous_stock = material.current_stock;
        let new_stock = previous_stock + quantity;
        if new_stock < 0 {
            return Err(match transaction_type {
                TransactionType::Usage => DomainError::InsufficientStock {
                    available: previous_stock,
                    requested: -quantity,
                },
                _ => DomainError::NegativeStock {
                    current: previous_stock,
                    delta: quantity,
                },
            });
        }

        Ok(Self {
            id,
            material_id: material.id,
            transaction_type,
            quantity,
            unit_cost,
            total_cost: unit_cost.map(|c| quantity.unsigned_abs() * c),
            previous_stock,
            new_stock,
            notes,
            created_at: now,
        })
    }
}
