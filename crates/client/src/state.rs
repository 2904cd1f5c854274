//! Explicit application state and the pure views derived from it.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use stockflow_auth::{Capability, Viewer, authorize};
use stockflow_inventory::StockMovement;
use stockflow_products::{CatalogQuery, Page, Product, PRODUCTS_PER_PAGE, StockAlerts, paginate};

use crate::error::{ApiError, ClientError};
use crate::history::{HISTORY_PER_PAGE, MovementFilter, MovementStats};

pub const HISTORY_FORBIDDEN_HINT: &str =
    "You do not have permission to view stock history. Please contact an administrator.";

pub const SESSION_EXPIRED_HINT: &str = "Your session has expired. Please log in again.";

/// Orders concurrent fetches of the same resource.
///
/// Each request takes a ticket when it starts. A result is applied only if no
/// result of a later-started request was applied before it.
#[derive(Debug, Default)]
pub struct FetchSequencer {
    issued: AtomicU64,
    applied: AtomicU64,
}

/// Start order of one fetch.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket(u64);

impl FetchSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> FetchTicket {
        FetchTicket(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Whether nothing newer than `ticket` has been applied yet.
    pub fn is_current(&self, ticket: FetchTicket) -> bool {
        ticket.0 > self.applied.load(Ordering::SeqCst)
    }

    /// Record `ticket` as applied; false (and no change) if it is stale.
    pub fn try_apply(&self, ticket: FetchTicket) -> bool {
        self.applied
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |applied| {
                (ticket.0 > applied).then_some(ticket.0)
            })
            .is_ok()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BannerKind {
    Error,
    Success,
}

/// Dismissible message above the current screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Banner {
    pub kind: BannerKind,
    pub message: String,
}

impl Banner {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: BannerKind::Error,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: BannerKind::Success,
            message: message.into(),
        }
    }

    pub fn from_error(err: &ClientError) -> Self {
        match err {
            ClientError::Api(api) => Self::from_api_error(api),
            other => Self::error(other.to_string()),
        }
    }

    /// Backend failure; a rejected token asks for a new login.
    pub fn from_api_error(err: &ApiError) -> Self {
        if err.requires_login() {
            Self::error(SESSION_EXPIRED_HINT)
        } else {
            Self::error(err.to_string())
        }
    }

    /// History fetch failure; 403 becomes a permission hint.
    pub fn from_history_error(err: &ApiError) -> Self {
        match err {
            ApiError::Forbidden(_) => Self::error(HISTORY_FORBIDDEN_HINT),
            other => Self::from_api_error(other),
        }
    }
}

/// Everything the screens render from.
#[derive(Debug)]
pub struct AppState {
    pub viewer: Viewer,
    pub products: Vec<Product>,
    pub movements: Vec<StockMovement>,
    pub alerts: StockAlerts,
    pub banner: Option<Banner>,
    catalog_query: CatalogQuery,
    catalog_page: usize,
    history_filter: MovementFilter,
    history_page: usize,
    products_seq: FetchSequencer,
    movements_seq: FetchSequencer,
}

impl AppState {
    pub fn new(viewer: Viewer) -> Self {
        Self {
            viewer,
            products: Vec::new(),
            movements: Vec::new(),
            alerts: StockAlerts::new(),
            banner: None,
            catalog_query: CatalogQuery::default(),
            catalog_page: 1,
            history_filter: MovementFilter::default(),
            history_page: 1,
            products_seq: FetchSequencer::new(),
            movements_seq: FetchSequencer::new(),
        }
    }

    pub fn catalog_query(&self) -> &CatalogQuery {
        &self.catalog_query
    }

    /// Changing any filter returns to the first page.
    pub fn set_catalog_query(&mut self, query: CatalogQuery) {
        if query != self.catalog_query {
            self.catalog_query = query;
            self.catalog_page = 1;
        }
    }

    pub fn set_catalog_page(&mut self, page: usize) {
        self.catalog_page = page.max(1);
    }

    pub fn history_filter(&self) -> &MovementFilter {
        &self.history_filter
    }

    pub fn set_history_filter(&mut self, filter: MovementFilter) {
        if filter != self.history_filter {
            self.history_filter = filter;
            self.history_page = 1;
        }
    }

    pub fn set_history_page(&mut self, page: usize) {
        self.history_page = page.max(1);
    }

    pub fn begin_products_fetch(&self) -> FetchTicket {
        self.products_seq.begin()
    }

    pub fn begin_movements_fetch(&self) -> FetchTicket {
        self.movements_seq.begin()
    }

    /// Apply a product listing result; returns false when it was stale.
    pub fn apply_products(&mut self, ticket: FetchTicket, result: Result<Vec<Product>, ApiError>) -> bool {
        match result {
            Ok(products) if self.products_seq.try_apply(ticket) => {
                tracing::debug!(count = products.len(), "product list refreshed");
                self.products = products;
                true
            }
            Err(err) if self.products_seq.is_current(ticket) => {
                self.banner = Some(Banner::from_api_error(&err));
                true
            }
            _ => {
                tracing::debug!(?ticket, "discarding stale product list response");
                false
            }
        }
    }

    /// Apply a movement listing result; returns false when it was stale.
    pub fn apply_movements(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<StockMovement>, ApiError>,
    ) -> bool {
        match result {
            Ok(movements) if self.movements_seq.try_apply(ticket) => {
                let inconsistent = movements.iter().filter(|m| !m.is_consistent()).count();
                if inconsistent > 0 {
                    tracing::warn!(inconsistent, "ledger entries disagree with movement rules");
                }
                self.movements = movements;
                true
            }
            Err(err) if self.movements_seq.is_current(ticket) => {
                self.banner = Some(Banner::from_history_error(&err));
                true
            }
            _ => {
                tracing::debug!(?ticket, "discarding stale movement list response");
                false
            }
        }
    }

    pub fn show_error(&mut self, err: &ClientError) {
        self.banner = Some(Banner::from_error(err));
    }

    pub fn show_success(&mut self, message: impl Into<String>) {
        self.banner = Some(Banner::success(message));
    }

    pub fn dismiss_banner(&mut self) {
        self.banner = None;
    }

    /// Replace one product in place after a create/update/movement.
    pub fn upsert_product(&mut self, product: Product) {
        match self.products.iter_mut().find(|p| p.id == product.id) {
            Some(existing) => *existing = product,
            None => self.products.push(product),
        }
    }

    /// Current page of the product table.
    pub fn product_page(&self) -> Page<Product> {
        let stock_filter_enabled = authorize(&self.viewer, Capability::FilterByStock).is_ok();
        let filtered: Vec<Product> = self
            .catalog_query
            .apply(&self.products, stock_filter_enabled)
            .into_iter()
            .cloned()
            .collect();
        paginate(&filtered, self.catalog_page, PRODUCTS_PER_PAGE)
    }

    /// Current page of the history table.
    pub fn history_page(&self) -> Page<StockMovement> {
        let filtered: Vec<StockMovement> = self
            .history_filter
            .apply(&self.movements)
            .into_iter()
            .cloned()
            .collect();
        paginate(&filtered, self.history_page, HISTORY_PER_PAGE)
    }

    /// Per-type counts over the filtered history.
    pub fn history_stats(&self) -> MovementStats {
        MovementStats::from_movements(self.history_filter.apply(&self.movements))
    }
}
