use serde::{Deserialize, Serialize};

use stockflow_core::{DomainError, DomainResult, ProductId};
use stockflow_inventory::{DEFAULT_MINIMUM_STOCK, StockLevel};

/// Product as returned by the catalog endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub price: f64,
    /// On-hand count. Older backends still call it `initialQuantity`.
    #[serde(alias = "initialQuantity")]
    pub current_quantity: u64,
    #[serde(default)]
    pub minimum_stock: Option<u64>,
}

impl Product {
    pub fn minimum_stock_or_default(&self) -> u64 {
        self.minimum_stock.unwrap_or(DEFAULT_MINIMUM_STOCK)
    }

    pub fn stock_level(&self) -> StockLevel {
        StockLevel::classify(self.current_quantity, self.minimum_stock)
    }

    /// Case-insensitive match on name, description or category.
    /// `term` must already be lowercase.
    pub(crate) fn matches_lowercase(&self, term: &str) -> bool {
        self.name.to_lowercase().contains(term)
            || self.description.to_lowercase().contains(term)
            || self.category.to_lowercase().contains(term)
    }
}

/// Create/update body for `POST /products` and `PUT /products/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub price: f64,
    /// Seed level; the backend records it as an INITIAL movement.
    pub initial_quantity: u64,
    pub minimum_stock: u64,
}

impl ProductDraft {
    pub fn new(name: impl Into<String>, price: f64) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            category: String::new(),
            price,
            initial_quantity: 0,
            minimum_stock: DEFAULT_MINIMUM_STOCK,
        }
    }

    /// Draft pre-filled from an existing product (edit form).
    pub fn from_product(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            description: product.description.clone(),
            category: product.category.clone(),
            price: product.price,
            initial_quantity: product.current_quantity,
            minimum_stock: product.minimum_stock_or_default(),
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::invalid_field("name", "Product name is required"));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(DomainError::invalid_field("price", "Price must be a non-negative number"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_legacy_quantity_field_and_defaults() {
        let product: Product = serde_json::from_value(serde_json::json!({
            "id": 9,
            "name": "Bolt",
            "price": 0.25,
            "initialQuantity": 40
        }))
        .unwrap();
        assert_eq!(product.current_quantity, 40);
        assert_eq!(product.minimum_stock, None);
        assert_eq!(product.minimum_stock_or_default(), 5);
        assert_eq!(product.stock_level(), StockLevel::InStock);
        assert_eq!(product.category, "");
    }

    #[test]
    fn draft_validation() {
        assert!(ProductDraft::new("Nut", 1.0).validate().is_ok());
        assert!(ProductDraft::new("  ", 1.0).validate().is_err());
        assert!(ProductDraft::new("Nut", -0.5).validate().is_err());
        assert!(ProductDraft::new("Nut", f64::NAN).validate().is_err());
    }

    #[test]
    fn draft_serializes_seed_quantity() {
        let mut draft = ProductDraft::new("Nut", 1.5);
        draft.initial_quantity = 12;
        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["initialQuantity"], 12);
        assert_eq!(json["minimumStock"], 5);
    }
}
