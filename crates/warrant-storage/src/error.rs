//! Storage error types.

use std::path::PathBuf;

/// Errors from storage operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StorageError {
    /// The backend rejected or failed an operation.
    #[error("storage backend error: {0}")]
    Backend(String),

    /// A persistent store could not be opened at `path`.
    #[error("cannot open store at {}: {message}", path.display())]
    Open {
        /// Directory the store was opened at.
        path: PathBuf,
        /// Backend error message.
        message: String,
    },

    /// A row could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A namespace or key failed validation.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// A thread panicked while holding the in-memory table lock.
    #[error("in-memory store lock poisoned")]
    Poisoned,
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
