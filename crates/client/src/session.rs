//! Bearer-token session and its background refresh task.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::{Notify, RwLock};
use tokio::task::JoinHandle;

use stockflow_auth::{RoleFlags, TokenClaims, TokenError, Viewer, decode_unverified, validate_expiry};

/// Minimum remaining validity requested on each refresh.
pub const MIN_TOKEN_VALIDITY: Duration = Duration::from_secs(30);

/// Current login state as seen by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    token: Option<String>,
    claims: Option<TokenClaims>,
    viewer: Viewer,
}

/// Session shared between the API client and the refresher.
pub type SharedSession = Arc<RwLock<Session>>;

impl Session {
    pub fn anonymous() -> Self {
        Self {
            token: None,
            claims: None,
            viewer: Viewer::Anonymous,
        }
    }

    /// Build a session from a bearer token; roles of `client_id` count
    /// alongside realm roles.
    pub fn from_token(token: impl Into<String>, client_id: &str) -> Result<Self, TokenError> {
        let token = token.into();
        let claims = decode_unverified(&token)?;
        let flags = RoleFlags::from_roles(&claims.roles(client_id));
        let viewer = Viewer::Authenticated {
            username: claims.username().to_string(),
            flags,
        };
        Ok(Self {
            token: Some(token),
            claims: Some(claims),
            viewer,
        })
    }

    /// Like [`Session::from_token`], but also rejects a token whose time
    /// window is invalid or already over at `now`.
    pub fn restore(
        token: impl Into<String>,
        client_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, TokenError> {
        let session = Self::from_token(token, client_id)?;
        if let Some(claims) = session.claims() {
            validate_expiry(claims, now)?;
        }
        Ok(session)
    }

    /// True when there is no token, or it expires within `min_validity` of `now`.
    pub fn needs_refresh(&self, now: DateTime<Utc>, min_validity: Duration) -> bool {
        let Some(claims) = self.claims() else {
            return true;
        };
        match chrono::Duration::from_std(min_validity) {
            Ok(min_validity) => claims.expires_within(now, min_validity),
            Err(_) => true,
        }
    }

    pub fn shared(self) -> SharedSession {
        Arc::new(RwLock::new(self))
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn claims(&self) -> Option<&TokenClaims> {
        self.claims.as_ref()
    }

    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("token refresh failed: {0}")]
    Refresh(String),

    #[error("login failed: {0}")]
    Login(String),
}

/// External identity provider issuing bearer tokens.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Refresh if the current token expires within `min_validity`.
    /// Returns the new token, or `None` when no refresh was needed.
    async fn refresh(&self, min_validity: Duration) -> Result<Option<String>, IdentityError>;

    /// Start a fresh interactive login.
    async fn login(&self) -> Result<(), IdentityError>;
}

/// Why the refresher stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Shut down on request.
    Stopped,
    /// Refresh failed; a new login was forced and the session cleared.
    ReauthenticationRequired,
}

/// Background task that keeps the session token fresh.
pub struct TokenRefresher {
    provider: Arc<dyn IdentityProvider>,
    session: SharedSession,
    client_id: String,
    interval: Duration,
    min_validity: Duration,
}

/// Handle to a running [`TokenRefresher`].
pub struct RefresherHandle {
    shutdown: Arc<Notify>,
    join: JoinHandle<RefreshOutcome>,
}

impl RefresherHandle {
    /// Request shutdown and wait for the task to finish.
    pub async fn stop(self) -> RefreshOutcome {
        self.shutdown.notify_one();
        self.join().await
    }

    /// Wait for the task to finish on its own.
    pub async fn join(self) -> RefreshOutcome {
        match self.join.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("token refresher task failed: {}", e);
                RefreshOutcome::Stopped
            }
        }
    }
}

impl TokenRefresher {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        session: SharedSession,
        client_id: impl Into<String>,
        interval: Duration,
    ) -> Self {
        Self {
            provider,
            session,
            client_id: client_id.into(),
            interval,
            min_validity: MIN_TOKEN_VALIDITY,
        }
    }

    pub fn with_min_validity(mut self, min_validity: Duration) -> Self {
        self.min_validity = min_validity;
        self
    }

    /// Spawn the refresh loop.
    ///
    /// Every `interval` the provider is asked to refresh. A new token replaces
    /// the session (and its role flags). The first failure forces a new login,
    /// clears the session and ends the task.
    pub fn start(self) -> RefresherHandle {
        let shutdown = Arc::new(Notify::new());
        let signal = shutdown.clone();

        let join = tokio::spawn(async move {
            tracing::info!(interval_secs = self.interval.as_secs(), "token refresher started");

            let start = tokio::time::Instant::now() + self.interval;
            let mut ticker = tokio::time::interval_at(start, self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = signal.notified() => {
                        tracing::info!("token refresher received shutdown signal");
                        return RefreshOutcome::Stopped;
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = self.refresh_once().await {
                            tracing::warn!("{}; forcing re-authentication", e);
                            self.force_login().await;
                            return RefreshOutcome::ReauthenticationRequired;
                        }
                    }
                }
            }
        });

        RefresherHandle { shutdown, join }
    }

    /// Ask the provider once and install any new token.
    pub async fn refresh_once(&self) -> Result<(), IdentityError> {
        match self.provider.refresh(self.min_validity).await? {
            Some(token) => {
                let session = Session::from_token(token, &self.client_id)
                    .map_err(|e| IdentityError::Refresh(e.to_string()))?;
                *self.session.write().await = session;
                tracing::debug!("session token refreshed");
            }
            None => tracing::debug!("session token still valid"),
        }
        Ok(())
    }

    async fn force_login(&self) {
        *self.session.write().await = Session::anonymous();
        if let Err(e) = self.provider.login().await {
            tracing::error!("{}", e);
        }
    }
}
