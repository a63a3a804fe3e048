//! Error Taxonomy
//!
//! Crate-wide error kinds for the alert delivery control plane. Each
//! subsystem returns `CoreError` (or a type convertible into it) rather
//! than its own bespoke error, so callers at the outer API boundary can
//! map a single stable set of kinds onto status codes.

use thiserror::Error;

/// Result type used throughout the core.
pub type CoreResult<T> = Result<T, CoreError>;

/// Error kinds surfaced by the alert delivery control plane.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation failed: {0}")]
    ValidationFailed(String),

    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("invalid json: {0}")]
    InvalidJson(String),

    #[error("built-in template is immutable: {0}")]
    BuiltInImmutable(String),

    #[error("no pending alerts for channel {0}")]
    NoPendingAlerts(String),

    #[error("store error: {0}")]
    StoreError(String),

    #[error("dispatch failed on all channels for {0}")]
    DispatchFailure(String),

    #[error("shutdown did not complete within the wait window")]
    ShutdownTimeout,

    #[error("operation canceled")]
    Canceled,
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::InvalidJson(e.to_string())
    }
}
