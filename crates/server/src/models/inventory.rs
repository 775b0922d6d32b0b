//! Inventory screen and stock ledger types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use stride_core::inventory::{SizeStock, StockLevel};
use stride_core::{MovementType, OrderId, ProductId, StockMovementId, UserId};

/// A ledger entry.
#[derive(Debug, Clone, Serialize)]
pub struct StockMovement {
    pub id: StockMovementId,
    pub product_id: ProductId,
    pub product_name: String,
    pub size: Option<String>,
    pub movement_type: MovementType,
    /// Signed change; negative for units leaving stock.
    pub quantity: i32,
    pub resulting_stock: i32,
    pub note: Option<String>,
    pub order_id: Option<OrderId>,
    pub actor_id: Option<UserId>,
    pub actor_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A ledger entry to append.
#[derive(Debug, Clone)]
pub struct NewMovement {
    pub product_id: ProductId,
    pub size: Option<String>,
    pub movement_type: MovementType,
    pub quantity: i32,
    pub resulting_stock: i32,
    pub note: Option<String>,
    pub order_id: Option<OrderId>,
    pub actor_id: Option<UserId>,
}

/// One row of the inventory table.
#[derive(Debug, Clone, Serialize)]
pub struct InventoryRow {
    pub product_id: ProductId,
    pub name: String,
    pub slug: String,
    pub category: String,
    pub stock: i32,
    pub sizes: Vec<SizeStock>,
    pub out_of_stock: bool,
    pub is_active: bool,
    pub level: StockLevel,
    /// Sizes at or below the low-stock threshold.
    pub low_sizes: Vec<String>,
}

impl InventoryRow {
    #[must_use]
    pub fn is_low(&self) -> bool {
        self.level != StockLevel::InStock || !self.low_sizes.is_empty()
    }
}

/// Inventory table filter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InventoryQuery {
    pub category: Option<String>,
    #[serde(alias = "q")]
    pub search: Option<String>,
    /// Only rows that are low or out of stock.
    #[serde(default)]
    pub low_only: bool,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Ledger view filter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovementQuery {
    pub product_id: Option<ProductId>,
    pub movement_type: Option<MovementType>,
    pub order_id: Option<OrderId>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Inline stock edit.
///
/// `stock` applies to products without sizes; `sizes` lists the target
/// quantity for each size that changes. Both are absolute values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StockUpdate {
    pub stock: Option<i32>,
    #[serde(default)]
    pub sizes: Vec<SizeStock>,
    pub out_of_stock: Option<bool>,
    pub note: Option<String>,
}

impl StockUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stock.is_none() && self.sizes.is_empty() && self.out_of_stock.is_none()
    }
}

/// Hand-recorded movement (returns and corrections).
#[derive(Debug, Clone, Deserialize)]
pub struct ManualMovement {
    pub product_id: ProductId,
    pub size: Option<String>,
    pub movement_type: MovementType,
    pub quantity: i32,
    pub note: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(level: StockLevel, low_sizes: &[&str]) -> InventoryRow {
        InventoryRow {
            product_id: ProductId::new(1),
            name: "Court Runner".to_owned(),
            slug: "court-runner".to_owned(),
            category: "sneakers".to_owned(),
            stock: 20,
            sizes: vec![],
            out_of_stock: false,
            is_active: true,
            level,
            low_sizes: low_sizes.iter().map(|s| (*s).to_owned()).collect(),
        }
    }

    #[test]
    fn test_is_low() {
        assert!(!row(StockLevel::InStock, &[]).is_low());
        assert!(row(StockLevel::InStock, &["11"]).is_low());
        assert!(row(StockLevel::OutOfStock, &[]).is_low());
    }

    #[test]
    fn test_empty_update() {
        assert!(StockUpdate::default().is_empty());
        let update = StockUpdate {
            out_of_stock: Some(true),
            ..StockUpdate::default()
        };
        assert!(!update.is_empty());
    }
}
