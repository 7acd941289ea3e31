//! Shared error type for the ingestion, store, and query layers.
//!
//! Internal plumbing (I/O, diesel, serialization) uses `anyhow::Result` and
//! is converted to `Error` at the public-API boundary, matching the split
//! used throughout the reference ingestion stack this crate is built on.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("validation failed for field '{field}': {reason}")]
    Validation { field: String, reason: String },

    #[error("could not parse frame: {0}")]
    FormatError(String),

    #[error("not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("cancelled")]
    Cancelled,
}

impl Error {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
