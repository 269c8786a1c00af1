//! # Inventory Attention
//!
//! Classifies products that need a person to look at them. Oversold stock
//! (negative `qty`) is a distinct condition, never an error.
//!
//! ```text
//!   qty < 0                         → Oversold     (checkout raced past stock)
//!   qty == 0                        → OutOfStock
//!   deadstock flag && qty > 0       → Deadstock    (flag set by analytics)
//!   0 < qty < threshold (or 3)      → LowStock
//!   otherwise                       → Healthy
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::Product;
use crate::DEFAULT_LOW_STOCK_THRESHOLD;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockCondition {
    Oversold,
    OutOfStock,
    Deadstock,
    LowStock,
    Healthy,
}

impl StockCondition {
    pub fn of(product: &Product) -> Self {
        let threshold = if product.threshold > 0 {
            product.threshold
        } else {
            DEFAULT_LOW_STOCK_THRESHOLD
        };

        if product.qty < 0 {
            StockCondition::Oversold
        } else if product.qty == 0 {
            StockCondition::OutOfStock
        } else if product.deadstock {
            StockCondition::Deadstock
        } else if product.qty < threshold {
            StockCondition::LowStock
        } else {
            StockCondition::Healthy
        }
    }
}

impl fmt::Display for StockCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StockCondition::Oversold => "oversold",
            StockCondition::OutOfStock => "out of stock",
            StockCondition::Deadstock => "deadstock",
            StockCondition::LowStock => "low stock",
            StockCondition::Healthy => "healthy",
        };
        f.write_str(s)
    }
}

/// A product with its condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttentionItem {
    pub product_id: String,
    pub sku: String,
    pub name: String,
    pub qty: i64,
    pub condition: StockCondition,
}

/// Every non-healthy product, worst condition first, then by qty and name.
pub fn attention_list(products: &[Product]) -> Vec<AttentionItem> {
    let mut items: Vec<AttentionItem> = products
        .iter()
        .filter_map(|p| {
            let condition = StockCondition::of(p);
            (condition != StockCondition::Healthy).then(|| AttentionItem {
                product_id: p.id.clone(),
                sku: p.sku.clone(),
                name: p.name.clone(),
                qty: p.qty,
                condition,
            })
        })
        .collect();

    items.sort_by(|a, b| {
        a.condition
            .cmp(&b.condition)
            .then_with(|| a.qty.cmp(&b.qty))
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
    items
}

/// Products at or below an explicitly set reorder point.
pub fn reorder_list(products: &[Product]) -> Vec<&Product> {
    let mut items: Vec<&Product> = products
        .iter()
        .filter(|p| p.threshold > 0 && p.qty <= p.threshold)
        .collect();
    items.sort_by(|a, b| a.qty.cmp(&b.qty).then_with(|| a.name.cmp(&b.name)));
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn product(name: &str, qty: i64, threshold: i64, deadstock: bool) -> Product {
        Product {
            id: name.to_lowercase(),
            sku: name.to_uppercase(),
            name: name.to_string(),
            price_cents: 100,
            qty,
            threshold,
            deadstock,
            monthly_sales: BTreeMap::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_classification() {
        assert_eq!(StockCondition::of(&product("a", -1, 0, false)), StockCondition::Oversold);
        assert_eq!(StockCondition::of(&product("a", 0, 0, true)), StockCondition::OutOfStock);
        assert_eq!(StockCondition::of(&product("a", 10, 0, true)), StockCondition::Deadstock);
        assert_eq!(StockCondition::of(&product("a", 2, 0, false)), StockCondition::LowStock);
        assert_eq!(StockCondition::of(&product("a", 3, 0, false)), StockCondition::Healthy);
        assert_eq!(StockCondition::of(&product("a", 8, 10, false)), StockCondition::LowStock);
    }

    #[test]
    fn test_attention_oversold_first() {
        let products = vec![
            product("Low", 1, 0, false),
            product("Fine", 50, 0, false),
            product("Gone", 0, 0, false),
            product("Negative", -3, 0, false),
        ];
        let list = attention_list(&products);
        let names: Vec<&str> = list.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Negative", "Gone", "Low"]);
    }

    #[test]
    fn test_reorder_requires_threshold() {
        let products = vec![
            product("NoThreshold", 0, 0, false),
            product("AtPoint", 5, 5, false),
            product("Above", 6, 5, false),
        ];
        let list = reorder_list(&products);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].name, "AtPoint");
    }
}
