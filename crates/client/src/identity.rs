//! OAuth2 refresh-token grant against the identity provider's token endpoint.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::session::{IdentityError, IdentityProvider, SharedSession};

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorBody {
    error: Option<String>,
    error_description: Option<String>,
}

/// [`IdentityProvider`] exchanging a refresh token for new access tokens.
///
/// Rotated refresh tokens returned by the endpoint replace the stored one.
pub struct RefreshTokenProvider {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    refresh_token: Mutex<String>,
    session: SharedSession,
}

impl RefreshTokenProvider {
    pub fn new(
        http: reqwest::Client,
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        refresh_token: impl Into<String>,
        session: SharedSession,
    ) -> Self {
        Self {
            http,
            token_url: token_url.into(),
            client_id: client_id.into(),
            refresh_token: Mutex::new(refresh_token.into()),
            session,
        }
    }

    /// Provider for `config`, or `None` when no token endpoint or refresh
    /// token is configured.
    pub fn from_config(config: &ClientConfig, session: SharedSession) -> Result<Option<Self>, ApiError> {
        let (Some(token_url), Some(refresh_token)) = (&config.token_url, &config.refresh_token) else {
            return Ok(None);
        };
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Some(Self::new(
            http,
            token_url.clone(),
            config.client_id.clone(),
            refresh_token.clone(),
            session,
        )))
    }

    async fn exchange(&self) -> Result<String, IdentityError> {
        let mut refresh_token = self.refresh_token.lock().await;

        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.client_id.as_str()),
                ("refresh_token", refresh_token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| IdentityError::Refresh(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let reason = serde_json::from_str::<TokenErrorBody>(&body)
                .ok()
                .and_then(|b| b.error_description.or(b.error))
                .unwrap_or_else(|| format!("token endpoint returned {status}"));
            return Err(IdentityError::Refresh(reason));
        }

        let tokens: TokenResponse = response
            .json()
            .await
            .map_err(|e| IdentityError::Refresh(e.to_string()))?;
        if let Some(rotated) = tokens.refresh_token {
            *refresh_token = rotated;
        }
        Ok(tokens.access_token)
    }
}

#[async_trait]
impl IdentityProvider for RefreshTokenProvider {
    async fn refresh(&self, min_validity: Duration) -> Result<Option<String>, IdentityError> {
        if !self.session.read().await.needs_refresh(Utc::now(), min_validity) {
            return Ok(None);
        }
        let token = self.exchange().await?;
        tracing::debug!(token_url = %self.token_url, "access token refreshed");
        Ok(Some(token))
    }

    async fn login(&self) -> Result<(), IdentityError> {
        Err(IdentityError::Login(
            "session expired; obtain a new token and set STOCKFLOW_TOKEN / STOCKFLOW_REFRESH_TOKEN".to_string(),
        ))
    }
}
