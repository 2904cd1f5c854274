use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Role;

/// `{"roles": [...]}` block used by the identity provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSet {
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Access-token claims as issued by the identity provider.
///
/// Only the fields the client reads are modelled; everything else is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject / user identifier.
    pub sub: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,

    /// Expiration (seconds since the epoch).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Issued-at (seconds since the epoch).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Realm-wide roles.
    #[serde(default)]
    pub realm_access: RoleSet,

    /// Client-scoped roles, keyed by client id.
    #[serde(default)]
    pub resource_access: HashMap<String, RoleSet>,
}

impl TokenClaims {
    /// Display name: preferred username, falling back to the subject.
    pub fn username(&self) -> &str {
        self.preferred_username.as_deref().unwrap_or(&self.sub)
    }

    /// Realm roles followed by the roles of `client_id`, normalized.
    pub fn roles(&self, client_id: &str) -> Vec<Role> {
        let client_roles = self
            .resource_access
            .get(client_id)
            .map(|set| set.roles.as_slice())
            .unwrap_or_default();

        self.realm_access
            .roles
            .iter()
            .chain(client_roles)
            .map(|r| Role::normalized(r))
            .collect()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|s| DateTime::from_timestamp(s, 0))
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.iat.and_then(|s| DateTime::from_timestamp(s, 0))
    }

    /// True when the token is expired or will be within `min_validity`.
    pub fn expires_within(&self, now: DateTime<Utc>, min_validity: Duration) -> bool {
        match self.expires_at() {
            Some(exp) => exp - now <= min_validity,
            None => false,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token has expired")]
    Expired,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,
}

/// Read the claims of a bearer token without verifying its signature.
///
/// The backend verifies every request; the client only needs the claims to
/// decide what to show.
pub fn decode_unverified(token: &str) -> Result<TokenClaims, TokenError> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::new();

    jsonwebtoken::decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|e| TokenError::Malformed(e.to_string()))
}

/// Deterministically check the token's time window against `now`.
pub fn validate_expiry(claims: &TokenClaims, now: DateTime<Utc>) -> Result<(), TokenError> {
    if let (Some(iat), Some(exp)) = (claims.iat, claims.exp) {
        if exp <= iat {
            return Err(TokenError::InvalidTimeWindow);
        }
    }
    match claims.expires_at() {
        Some(exp) if now >= exp => Err(TokenError::Expired),
        _ => Ok(()),
    }
}
