//! Shared primitives for all Rust crates in the auth event stream pipeline.

#![forbid(unsafe_code)]

use thiserror::Error;

/// Result type used across the pipeline crates.
pub type AppResult<T> = Result<T, AppError>;

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Caller is not authenticated for the requested operation.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// A backing service did not answer in time or refused the connection.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}
