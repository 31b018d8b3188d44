//! Rollback error types.

use thiserror::Error;
use warrant_audit::AuditError;
use warrant_core::{ActionClass, AuditEntryId, RollbackId};
use warrant_storage::StorageError;

/// Errors that reject a rollback request before or while it is admitted.
///
/// Failures of the undo operation itself are not errors: they resolve to a
/// rollback record with `failed` status.
#[derive(Debug, Error)]
pub enum RollbackError {
    /// The caller does not own the audit entry.
    #[error("Access denied")]
    AccessDenied,

    /// The audit entry does not exist.
    #[error("Audit entry not found")]
    AuditEntryNotFound(AuditEntryId),

    /// The entry cannot be rolled back; carries the eligibility reason.
    #[error("{reason}")]
    NotEligible {
        /// Why the entry is ineligible.
        reason: String,
    },

    /// No undo handler is registered for the action class.
    #[error("no undo handler registered for {0}")]
    NoUndoHandler(ActionClass),

    /// A rollback of this entry already completed.
    #[error("audit entry already rolled back by {0}")]
    AlreadyRolledBack(RollbackId),

    /// A rollback of this entry is pending or in progress.
    #[error("a rollback of this audit entry is already in progress")]
    InProgress,

    /// The undo task ended without reporting an outcome.
    #[error("rollback interrupted: {0}")]
    Interrupted(String),

    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<StorageError> for RollbackError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Serialization(msg) => Self::Serialization(msg),
            other => Self::Storage(other.to_string()),
        }
    }
}

impl From<AuditError> for RollbackError {
    fn from(e: AuditError) -> Self {
        match e {
            AuditError::SerializationError(msg) => Self::Serialization(msg),
            other => Self::Storage(other.to_string()),
        }
    }
}

/// Result type for rollback operations.
pub type RollbackResult<T> = Result<T, RollbackError>;
