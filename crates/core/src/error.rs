//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Rejected user or wire input.
///
/// Deterministic failures only. Transport failures live in the client crate,
/// and stock movement rules have their own error type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A form field failed validation.
    #[error("{message}")]
    InvalidField { field: &'static str, message: String },

    /// Text that names none of the accepted values.
    #[error("unknown {kind} '{value}' (expected one of: {expected})")]
    UnknownValue {
        kind: &'static str,
        value: String,
        expected: &'static str,
    },

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn invalid_field(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            message: message.into(),
        }
    }

    pub fn unknown_value(kind: &'static str, value: &str, expected: &'static str) -> Self {
        Self::UnknownValue {
            kind,
            value: value.trim().to_string(),
            expected,
        }
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    /// Field the error refers to, when it refers to one.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::InvalidField { field, .. } => Some(field),
            _ => None,
        }
    }
}
