//! Persisted-state storage error types

/// Errors that can occur while reading or writing persisted table state.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// SQLite backend error.
    #[error("Database error: {0}")]
    Database(#[from] async_sqlite::Error),

    /// The stored blob could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
