//! Audit-related error types.

use thiserror::Error;
use warrant_storage::StorageError;

/// Errors that can occur with audit logging.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Storage error.
    #[error("storage error: {0}")]
    StorageError(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// The record handed to the ledger is malformed.
    #[error("invalid audit record: {0}")]
    InvalidRecord(String),
}

impl From<StorageError> for AuditError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Serialization(msg) => Self::SerializationError(msg),
            other => Self::StorageError(other.to_string()),
        }
    }
}

/// Result type for audit operations.
pub type AuditResult<T> = Result<T, AuditError>;
