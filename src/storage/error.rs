//! Store error types
//!
//! Defines all errors that can occur in the persistence layer.

use thiserror::Error;

/// Errors that can occur in the meme store
#[derive(Error, Debug)]
pub enum StoreError {
    /// I/O operation on the backing medium failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored value could not be encoded or decoded as JSON
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Write would exceed the backend's storage quota
    #[error("Storage quota exceeded: {needed} bytes needed, {limit} byte limit")]
    QuotaExceeded { needed: usize, limit: usize },

    /// Stored envelope was written by a newer schema
    #[error("Unsupported schema version {found} for key {key} (max {supported})")]
    UnsupportedVersion {
        key: String,
        found: u32,
        supported: u32,
    },

    /// Storage has been disabled or is unreachable
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Lock acquisition failed
    #[error("Lock error: {0}")]
    Lock(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        StoreError::Lock(err.to_string())
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
