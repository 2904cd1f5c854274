//! `stockflow-core` — shared building blocks.
//!
//! Pure primitives only (no IO). Everything the backend owns is referred to
//! by the identifiers defined here.

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{MovementId, ProductId};
