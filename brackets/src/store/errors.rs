//! Storage error types.

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored row could not be decoded
    #[error("Corrupt row: {0}")]
    Corrupt(String),

    /// A row expected by an update is missing
    #[error("Row not found: {0}")]
    Missing(String),

    /// A value does not fit its column
    #[error("Value out of range: {0}")]
    OutOfRange(String),

    /// Unique key already taken
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Settings could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid storage configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;
