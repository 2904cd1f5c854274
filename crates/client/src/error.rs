//! Client error model.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use stockflow_auth::AuthzError;
use stockflow_core::DomainError;
use stockflow_inventory::MovementError;

/// Failure reported by (or on the way to) the REST backend.
///
/// Scoped to the single in-flight operation; never retried automatically.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),

    /// 401
    #[error("{0}")]
    Unauthorized(String),

    /// 403
    #[error("{0}")]
    Forbidden(String),

    /// 404
    #[error("{0}")]
    NotFound(String),

    /// 400 / 422
    #[error("{message}")]
    ServerValidation { status: u16, message: String },

    #[error("{message}")]
    Server { status: u16, message: String },

    #[error("failed to decode response: {0}")]
    Decode(String),
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl ApiError {
    /// Map a non-success response. The body's `message` is surfaced verbatim
    /// when present; otherwise a generic fallback naming the status.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.message)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| {
                format!(
                    "API Error: {}",
                    status.canonical_reason().unwrap_or(status.as_str())
                )
            });

        match status {
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized(message),
            StatusCode::FORBIDDEN => ApiError::Forbidden(message),
            StatusCode::NOT_FOUND => ApiError::NotFound(message),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                ApiError::ServerValidation {
                    status: status.as_u16(),
                    message,
                }
            }
            _ => ApiError::Server {
                status: status.as_u16(),
                message,
            },
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized(_) => Some(401),
            ApiError::Forbidden(_) => Some(403),
            ApiError::NotFound(_) => Some(404),
            ApiError::ServerValidation { status, .. } | ApiError::Server { status, .. } => {
                Some(*status)
            }
            ApiError::Network(_) | ApiError::Decode(_) => None,
        }
    }

    /// Whether the session should be re-established.
    pub fn requires_login(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Anything that can stop a user action.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Movement rejected before submission.
    #[error(transparent)]
    Movement(#[from] MovementError),

    /// Form input rejected before submission.
    #[error(transparent)]
    Invalid(#[from] DomainError),

    /// The viewer's role does not offer this action.
    #[error(transparent)]
    Authz(#[from] AuthzError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl ClientError {
    /// True for failures detected locally, before any network call.
    pub fn is_client_side(&self) -> bool {
        !matches!(self, ClientError::Api(_))
    }
}
