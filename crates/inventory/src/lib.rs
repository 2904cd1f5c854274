//! Inventory domain module.
//!
//! Stock movement rules implemented as deterministic domain logic (no IO, no
//! HTTP, no storage). The backend owns the authoritative quantities; this crate
//! only computes what it is expected to produce.

pub mod calculator;
pub mod ledger;
pub mod level;
pub mod movement;

pub use calculator::{
    MovementCalculation, MovementError, MovementRequest, RawAmount, ValidatedMovement, calculate,
    preview_quantity, resulting_quantity, validate,
};
pub use ledger::{NewStockMovement, StockMovement};
pub use level::{DEFAULT_MINIMUM_STOCK, StockLevel};
pub use movement::{DeltaIndicator, MovementEffect, MovementType};
