//! Kernel error types.

use thiserror::Error;
use warrant_audit::AuditError;
use warrant_config::ConfigError;
use warrant_storage::StorageError;
use warrant_telemetry::TelemetryError;

/// Errors raised while assembling a [`Warrant`](crate::Warrant) or running
/// the proxy-action flow.
#[derive(Debug, Error)]
pub enum KernelError {
    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The storage backend could not be opened.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The outcome of an executed action could not be recorded.
    #[error(transparent)]
    Audit(#[from] AuditError),

    /// The log subscriber could not be installed.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
}

/// Result type for kernel operations.
pub type KernelResult<T> = Result<T, KernelError>;
