//! `stockflow-auth` — identity-provider claims and UI role gating.
//!
//! Decoupled from HTTP. Tokens are issued and verified elsewhere (identity
//! provider, backend); this crate only reads them to decide what the client
//! offers. The backend enforces authorization independently.

pub mod authorize;
pub mod claims;
pub mod roles;

pub use authorize::{AuthzError, Capability, Viewer, authorize};
pub use claims::{RoleSet, TokenClaims, TokenError, decode_unverified, validate_expiry};
pub use roles::{AccessLevel, Role, RoleFlags};
