//! Tracing/logging setup shared by every stockflow binary.

/// Initialize process-wide logging in the format named by
/// `STOCKFLOW_LOG_FORMAT` (JSON when unset).
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(tracing::LogFormat::from_env());
}

/// Tracing configuration (filters, formats).
pub mod tracing;

pub use self::tracing::LogFormat;
