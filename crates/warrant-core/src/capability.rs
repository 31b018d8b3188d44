//! Host-injected capabilities.
//!
//! The concrete mail, calendar, issue-tracker, chat and task clients live
//! outside this core. The host hands them in through these traits: an
//! [`ActionExecutor`] performs the real side effect, an [`UndoAction`]
//! reverses one for a given action class.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::action::{ActionClass, RollbackStrategy};

/// Error reported by an injected capability.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CapabilityError {
    /// The external service rejected or failed the call.
    #[error("{0}")]
    Failed(String),

    /// The capability does not handle this action class.
    #[error("unsupported action class: {0}")]
    Unsupported(ActionClass),
}

/// Result type for capability calls.
pub type CapabilityResult<T> = Result<T, CapabilityError>;

/// Executes a real side effect (`performAction`).
///
/// # Example
///
/// ```rust,ignore
/// struct Gmail { /* client */ }
///
/// #[async_trait::async_trait]
/// impl ActionExecutor for Gmail {
///     async fn perform(&self, class: &ActionClass, input: &Value) -> CapabilityResult<Value> {
///         // send the message, return the provider's response
///     }
/// }
/// ```
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Perform `action_class` with `input`, returning the provider output.
    async fn perform(
        &self,
        action_class: &ActionClass,
        input: &serde_json::Value,
    ) -> CapabilityResult<serde_json::Value>;
}

/// Everything an undo handler needs to reverse one audited action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollbackData {
    /// Input the original action was performed with.
    pub original_input: serde_json::Value,
    /// Output the provider returned (without the eligibility marker).
    pub original_output: serde_json::Value,
    /// How the action is to be reversed.
    pub strategy: RollbackStrategy,
    /// Identifier of the affected resource, when the output carried one.
    pub resource_id: Option<String>,
    /// Human-readable undo instructions.
    pub instructions: String,
}

/// Performs the compensating or undo operation for an action class (`undoAction`).
#[async_trait]
pub trait UndoAction: Send + Sync {
    /// Reverse the effect described by `data`.
    async fn undo(&self, action_class: &ActionClass, data: &RollbackData) -> CapabilityResult<()>;
}
