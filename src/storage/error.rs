//! Storage-specific error types.

use thiserror::Error;

/// Errors that can occur in the storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] duckdb::Error),

    /// Schema migration failed; the store must not be used.
    #[error("migration error: {0}")]
    Migration(String),

    /// JSON serialization/deserialization error for embedded documents.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid data in the database (e.g., unknown enum value).
    #[error("invalid data: {0}")]
    InvalidData(String),
}
