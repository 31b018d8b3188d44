//! Authorization error types.

use thiserror::Error;
use warrant_audit::AuditError;
use warrant_core::AuthorizationId;
use warrant_storage::StorageError;

/// Errors that can occur while granting, revoking or reading authorizations.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// The caller does not own the record it tried to mutate.
    #[error("Access denied")]
    AccessDenied,

    /// No authorization with this id exists.
    #[error("authorization not found: {0}")]
    NotFound(AuthorizationId),

    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The audit ledger could not be consulted.
    #[error("audit error: {0}")]
    Audit(String),
}

impl From<StorageError> for AuthzError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Serialization(msg) => Self::Serialization(msg),
            other => Self::Storage(other.to_string()),
        }
    }
}

impl From<AuditError> for AuthzError {
    fn from(e: AuditError) -> Self {
        Self::Audit(e.to_string())
    }
}

/// Result type for authorization operations.
pub type AuthzResult<T> = Result<T, AuthzError>;
