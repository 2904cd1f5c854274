//! Stock alerts shown above the product table.

use std::collections::HashSet;

use stockflow_core::ProductId;
use stockflow_inventory::StockLevel;

use crate::product::Product;

/// Products needing attention, minus the ones the user dismissed.
#[derive(Debug, Clone, Default)]
pub struct StockAlerts {
    dismissed: HashSet<ProductId>,
}

impl StockAlerts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dismiss(&mut self, product_id: ProductId) {
        self.dismissed.insert(product_id);
    }

    pub fn is_dismissed(&self, product_id: ProductId) -> bool {
        self.dismissed.contains(&product_id)
    }

    pub fn out_of_stock<'a>(&self, products: &'a [Product]) -> Vec<&'a Product> {
        self.matching(products, StockLevel::OutOfStock)
    }

    pub fn low_stock<'a>(&self, products: &'a [Product]) -> Vec<&'a Product> {
        self.matching(products, StockLevel::LowStock)
    }

    pub fn has_alerts(&self, products: &[Product]) -> bool {
        products
            .iter()
            .any(|p| p.stock_level().needs_attention() && !self.is_dismissed(p.id))
    }

    fn matching<'a>(&self, products: &'a [Product], level: StockLevel) -> Vec<&'a Product> {
        products
            .iter()
            .filter(|p| p.stock_level() == level && !self.is_dismissed(p.id))
            .collect()
    }
}
