//! Read-side rollups over material balances: stock alerts and the
//! inventory summary. Pure functions over material slices; callers decide
//! which materials (normally the active ones) to feed in.

use std::collections::BTreeMap;

use serde::Serialize;

use fieldstock_core::MaterialId;

use crate::material::Material;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Critical,
    Warning,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StockAlertKind {
    OutOfStock,
    LowStock,
    ReorderNeeded,
}

/// One alert per material at or below a stock threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockAlert {
    pub material_id: MaterialId,
    pub name: String,
    pub category: String,
    pub current_stock: i64,
    pub min_stock: i64,
    pub reorder_point: i64,
    pub kind: StockAlertKind,
    pub severity: AlertSeverity,
}

/// Classify one material against its thresholds.
///
/// Ordered chain, lowest threshold wins: a material at or below both
/// `min_stock` and `reorder_point` is reported once, as `low_stock`.
pub fn classify_stock(material: &Material) -> Option<StockAlert> {
    let (kind, severity) = if material.current_stock == 0 {
        (StockAlertKind::OutOfStock, AlertSeverity::Critical)
    } else if material.current_stock <= material.min_stock {
        (StockAlertKind::LowStock, AlertSeverity::Warning)
    } else if material.current_stock <= material.reorder_point {
        (StockAlertKind::ReorderNeeded, AlertSeverity::Warning)
    } else {
        return None;
    };

    Some(StockAlert {
        material_id: material.id,
        name: material.name.clone(),
        category: material.category.clone(),
        current_stock: material.current_stock,
        min_stock: material.min_stock,
        reorder_point: material.reorder_point,
        kind,
        severity,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    pub category: String,
    pub material_count: usize,
    /// Σ current_stock × unit_cost, in smallest currency units.
    pub total_value: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventorySummary {
    pub material_count: usize,
    pub total_value: u64,
    /// Materials with `0 < current_stock <= min_stock`.
    pub low_stock_count: usize,
    pub out_of_stock_count: usize,
    pub categories: Vec<CategorySummary>,
}

/// Aggregate totals over the given materials. O(n), recomputed per call.
pub fn summarize<'a, I>(materials: I) -> InventorySummary
where
    I: IntoIterator<Item = &'a Material>,
{
    let mut material_count = 0usize;
    let mut total_value = 0u64;
    let mut low_stock_count = 0usize;
    let mut out_of_stock_count = 0usize;
    let mut categories: BTreeMap<String, CategorySummary> = BTreeMap::new();

    for material in materials {
        material_count += 1;
        // current_stock >= 0 is a ledger invariant.
        let value = material.current_stock.max(0) as u64 * material.unit_cost;
        total_value += value;

        if material.current_stock == 0 {
            out_of_stock_count += 1;
        } else if material.current_stock <= material.min_stock {
            low_stock_count += 1;
        }

        let entry = categories
            .entry(material.category.clone())
            .or_insert_with(|| CategorySummary {
                category: material.category.clone(),
                material_count: 0,
                total_value: 0,
            });
        entry.material_count += 1;
        entry.total_value += value;
    }

    InventorySummary {
        material_count,
        total_value,
        low_stock_count,
        out_of_stock_count,
        categories: categories.into_values().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::NewMaterial;
    use chrono::Utc;

    fn material(name: &str, category: &str, stock: i64, min: i64, reorder: i64) -> Material {
        Material::create(
            MaterialId::new(),
            NewMaterial {
                name: name.to_string(),
                description: None,
                category: category.to_string(),
                sku: None,
                unit_cost: 100,
                initial_stock: stock,
                min_stock: min,
                reorder_point: reorder,
                is_tool: false,
                next_maintenance_date: None,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn healthy_stock_produces_no_alert() {
        let m = material("Drill", "power tools", 5, 2, 3);
        assert_eq!(classify_stock(&m), None);
    }

    #[test]
    fn alert_escalates_as_stock_drains() {
        let mut m = material("Drill", "power tools", 3, 2, 3);
        let alert = classify_stock(&m).unwrap();
        assert_eq!(alert.kind, StockAlertKind::ReorderNeeded);
        assert_eq!(alert.severity, AlertSeverity::Warning);

        m.current_stock = 1;
        let alert = classify_stock(&m).unwrap();
        assert_eq!(alert.kind, StockAlertKind::LowStock);
        assert_eq!(alert.severity, AlertSeverity::Warning);

        m.current_stock = 0;
        let alert = classify_stock(&m).unwrap();
        assert_eq!(alert.kind, StockAlertKind::OutOfStock);
        assert_eq!(alert.severity, AlertSeverity::Critical);
    }

    #[test]
    fn low_stock_wins_when_both_thresholds_hit() {
        // At or below min_stock AND reorder_point: reported once, as low_stock.
        let m = material("Drill", "power tools", 2, 2, 4);
        let alert = classify_stock(&m).unwrap();
        assert_eq!(alert.kind, StockAlertKind::LowStock);
    }

    #[test]
    fn summary_totals_and_category_rollup() {
        let materials = vec![
            material("Drill", "power tools", 5, 2, 3),   // value 500
            material("Saw", "power tools", 0, 1, 2),     // out of stock
            material("Screws", "fasteners", 2, 4, 6),    // low stock, value 200
        ];

        let summary = summarize(materials.iter());
        assert_eq!(summary.material_count, 3);
        assert_eq!(summary.total_value, 700);
        assert_eq!(summary.low_stock_count, 1);
        assert_eq!(summary.out_of_stock_count, 1);

        // BTreeMap keeps categories sorted.
        assert_eq!(summary.categories.len(), 2);
        assert_eq!(summary.categories[0].category, "fasteners");
        assert_eq!(summary.categories[0].total_value, 200);
        assert_eq!(summary.categories[1].category, "power tools");
        assert_eq!(summary.categories[1].material_count, 2);
    }

    #[test]
    fn summary_of_nothing_is_empty() {
        let summary = summarize(std::iter::empty());
        assert_eq!(summary.material_count, 0);
        assert_eq!(summary.total_value, 0);
        assert!(summary.categories.is_empty());
    }
}
