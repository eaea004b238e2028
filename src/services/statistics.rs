use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashSet;

use crate::models::Product;

/// How many products the "recently added" list keeps.
pub const RECENT_LIMIT: usize = 5;

/// Aggregate figures over the whole catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryStats {
    pub total_products: usize,
    pub total_cities: usize,
    pub out_of_stock: usize,
    /// Sum of unit prices across products
    pub total_inventory_value: Decimal,
    pub recently_added: Vec<Product>,
}

impl InventoryStats {
    pub fn compute(products: &[Product]) -> Self {
        let cities: HashSet<&str> = products.iter().map(|p| p.city.as_str()).collect();

        let mut recent: Vec<&Product> = products.iter().collect();
        // newest first, undated records last
        recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Self {
            total_products: products.len(),
            total_cities: cities.len(),
            out_of_stock: products.iter().filter(|p| !p.in_stock()).count(),
            total_inventory_value: products.iter().map(|p| p.price).sum(),
            recently_added: recent.into_iter().take(RECENT_LIMIT).cloned().collect(),
        }
    }
}
