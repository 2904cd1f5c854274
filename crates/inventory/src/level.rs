//! Low-stock classification.

use serde::{Deserialize, Serialize};

/// Reorder threshold used when a product has none configured.
pub const DEFAULT_MINIMUM_STOCK: u64 = 5;

/// Derived classification of an on-hand quantity against its threshold.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockLevel {
    OutOfStock,
    LowStock,
    InStock,
}

impl StockLevel {
    /// `0` is always out of stock; `1..=minimum` is low; above that is in stock.
    pub fn classify(quantity: u64, minimum_stock: Option<u64>) -> Self {
        let minimum = minimum_stock.unwrap_or(DEFAULT_MINIMUM_STOCK);
        if quantity == 0 {
            StockLevel::OutOfStock
        } else if quantity <= minimum {
            StockLevel::LowStock
        } else {
            StockLevel::InStock
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StockLevel::OutOfStock => "Out of stock",
            StockLevel::LowStock => "Low stock",
            StockLevel::InStock => "In stock",
        }
    }

    pub fn needs_attention(self) -> bool {
        self != StockLevel::InStock
    }
}

impl core::fmt::Display for StockLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}
