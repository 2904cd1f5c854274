//! Client-side catalog views: search, filters and pagination.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use stockflow_core::DomainError;
use stockflow_inventory::StockLevel;

use crate::product::Product;

/// Page size of the product table.
pub const PRODUCTS_PER_PAGE: usize = 10;

/// Stock-level filter of the product table.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockFilter {
    #[default]
    All,
    Low,
    Out,
    Normal,
}

impl StockFilter {
    pub fn accepts(self, level: StockLevel) -> bool {
        match self {
            StockFilter::All => true,
            StockFilter::Low => level == StockLevel::LowStock,
            StockFilter::Out => level == StockLevel::OutOfStock,
            StockFilter::Normal => level == StockLevel::InStock,
        }
    }
}

impl FromStr for StockFilter {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(StockFilter::All),
            "low" => Ok(StockFilter::Low),
            "out" => Ok(StockFilter::Out),
            "normal" | "in" => Ok(StockFilter::Normal),
            _ => Err(DomainError::unknown_value("stock filter", s, "all, low, out, normal")),
        }
    }
}

/// Filters applied to the product list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogQuery {
    pub search: String,
    /// `None` means every category.
    pub category: Option<String>,
    pub stock: StockFilter,
}

impl CatalogQuery {
    pub fn is_empty(&self) -> bool {
        self.search.trim().is_empty() && self.category.is_none() && self.stock == StockFilter::All
    }

    /// Filter `products`, preserving order.
    ///
    /// The stock filter only takes effect when `stock_filter_enabled`
    /// (viewers that may see stock levels).
    pub fn apply<'a>(&self, products: &'a [Product], stock_filter_enabled: bool) -> Vec<&'a Product> {
        let term = self.search.trim().to_lowercase();
        products
            .iter()
            .filter(|p| term.is_empty() || p.matches_lowercase(&term))
            .filter(|p| self.category.as_deref().is_none_or(|c| p.category == c))
            .filter(|p| !stock_filter_enabled || self.stock.accepts(p.stock_level()))
            .collect()
    }
}

/// Distinct non-empty categories in first-seen order.
pub fn categories(products: &[Product]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for product in products {
        if !product.category.is_empty() && !seen.contains(&product.category) {
            seen.push(product.category.clone());
        }
    }
    seen
}

/// One page of a filtered list (1-based).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub per_page: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    /// "Showing 11 to 20 of 42".
    pub fn summary(&self) -> String {
        if self.total_items == 0 {
            return "Showing 0 to 0 of 0".to_string();
        }
        let first = (self.page - 1) * self.per_page + 1;
        let last = (self.page * self.per_page).min(self.total_items);
        format!("Showing {first} to {last} of {}", self.total_items)
    }
}

/// Slice `items` into page `page`; out-of-range pages clamp to the nearest
/// valid one.
pub fn paginate<T: Clone>(items: &[T], page: usize, per_page: usize) -> Page<T> {
    let per_page = per_page.max(1);
    let total_items = items.len();
    let total_pages = total_items.div_ceil(per_page);
    let page = page.clamp(1, total_pages.max(1));

    let start = (page - 1) * per_page;
    let end = (start + per_page).min(total_items);
    let items = if start < end {
        items[start..end].to_vec()
    } else {
        Vec::new()
    };

    Page {
        items,
        page,
        per_page,
        total_items,
        total_pages,
    }
}
