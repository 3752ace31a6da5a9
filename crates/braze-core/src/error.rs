//! Error types for the core engine.
//!
//! Dispatch itself has no error channel: a middleware declining is normal
//! control flow, and unexpected panics are contained and logged at the
//! dispatch boundary. The only fallible surface is the outbound API path.

use thiserror::Error;

/// Errors surfaced by outbound API calls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No bot handle is attached to the context or engine.
    #[error("no bot attached")]
    NotConnected,

    /// The adapter did not answer within its deadline.
    #[error("api call timed out")]
    Timeout,

    /// The adapter answered with a failure code.
    #[error("api returned retcode {retcode}: {message}")]
    Response { retcode: i64, message: String },

    /// The operation does not apply to the current event family.
    #[error("operation not supported here: {0}")]
    Unsupported(&'static str),

    /// Parameter or response (de)serialization failed.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result alias for API calls.
pub type ApiResult<T> = Result<T, ApiError>;
