//! Client configuration from the environment.

use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8080";
pub const DEFAULT_API_PREFIX: &str = "/api/v2";
pub const DEFAULT_PUBLIC_PREFIX: &str = "/api/public";
pub const DEFAULT_CLIENT_ID: &str = "inventory-app-public";
pub const DEFAULT_REFRESH_SECS: u64 = 30;
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Where the backend lives and how the session is maintained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: String,
    /// Prefix of authenticated endpoints.
    pub api_prefix: String,
    /// Prefix of anonymous endpoints.
    pub public_prefix: String,
    /// Identity-provider client whose client roles count.
    pub client_id: String,
    /// Bearer token, when already logged in.
    pub token: Option<String>,
    /// Identity-provider token endpoint used for refreshes.
    pub token_url: Option<String>,
    /// Refresh token exchanged at `token_url`.
    pub refresh_token: Option<String>,
    pub refresh_interval: Duration,
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            public_prefix: DEFAULT_PUBLIC_PREFIX.to_string(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            token: None,
            token_url: None,
            refresh_token: None,
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_SECS),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Read `STOCKFLOW_*` variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let api_url = lookup("STOCKFLOW_API_URL").unwrap_or_else(|| {
            tracing::warn!("STOCKFLOW_API_URL not set; using {}", DEFAULT_API_URL);
            defaults.api_url.clone()
        });

        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            api_prefix: lookup("STOCKFLOW_API_PREFIX").unwrap_or(defaults.api_prefix),
            public_prefix: lookup("STOCKFLOW_PUBLIC_PREFIX").unwrap_or(defaults.public_prefix),
            client_id: lookup("STOCKFLOW_CLIENT_ID").unwrap_or(defaults.client_id),
            token: non_blank(lookup("STOCKFLOW_TOKEN")),
            token_url: non_blank(lookup("STOCKFLOW_TOKEN_URL")),
            refresh_token: non_blank(lookup("STOCKFLOW_REFRESH_TOKEN")),
            refresh_interval: seconds(&lookup, "STOCKFLOW_REFRESH_SECS", DEFAULT_REFRESH_SECS),
            request_timeout: seconds(&lookup, "STOCKFLOW_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS),
        }
    }

    /// `{api_url}{api_prefix}{path}`
    pub fn api_endpoint(&self, path: &str) -> String {
        format!("{}{}{}", self.api_url, self.api_prefix, path)
    }

    /// `{api_url}{public_prefix}{path}`
    pub fn public_endpoint(&self, path: &str) -> String {
        format!("{}{}{}", self.api_url, self.public_prefix, path)
    }

    /// Whether a background token refresh can run.
    pub fn can_refresh(&self) -> bool {
        self.token_url.is_some() && self.refresh_token.is_some()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn seconds(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> Duration {
    let secs = match lookup(key) {
        Some(raw) => raw.trim().parse::<u64>().unwrap_or_else(|_| {
            tracing::warn!("{key}={raw:?} is not a number of seconds; using {default}");
            default
        }),
        None => default,
    };
    Duration::from_secs(secs.max(1))
}
