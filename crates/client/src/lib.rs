//! `stockflow-client` — the collaborators around the stock movement rules.
//!
//! REST access to the backend, the bearer-token session and its refresher,
//! explicit screen state with stale-response protection, history views and
//! CSV export. Domain rules live in `stockflow-inventory` / `stockflow-products`.

pub mod actions;
pub mod api;
pub mod config;
pub mod error;
pub mod history;
pub mod identity;
pub mod session;
pub mod state;

pub use actions::{create_product, delete_product, load_history, submit_movement, update_product};
pub use api::{ApiClient, RECENT_MOVEMENTS_LIMIT};
pub use config::ClientConfig;
pub use error::{ApiError, ClientError};
pub use history::{HISTORY_PER_PAGE, MovementFilter, MovementStats, export_csv, export_filename};
pub use identity::RefreshTokenProvider;
pub use session::{
    IdentityError, IdentityProvider, MIN_TOKEN_VALIDITY, RefreshOutcome, RefresherHandle, Session, SharedSession,
    TokenRefresher,
};
pub use state::{AppState, Banner, BannerKind, FetchSequencer, FetchTicket};
