//! Product catalog module.
//!
//! Read models for products as served by the backend, plus the client-side
//! derived views over them: search/filter, pagination and stock alerts.

pub mod alerts;
pub mod catalog;
pub mod product;

pub use alerts::StockAlerts;
pub use catalog::{CatalogQuery, Page, StockFilter, categories, paginate, PRODUCTS_PER_PAGE};
pub use product::{Product, ProductDraft};
