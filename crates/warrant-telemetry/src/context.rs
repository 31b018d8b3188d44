//! Request correlation for decisions made on a user's behalf.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use warrant_core::{ActionClass, UserId};

/// Identifies one host request as it flows through the control plane.
///
/// The kernel enters [`span`](Self::span) around each guarded action so the
/// check, execution and audit events of one request share the same fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Unique request identifier.
    pub request_id: Uuid,
    /// Shared by every request spawned from the same user interaction.
    pub correlation_id: Uuid,
    /// The request this one was spawned from.
    pub parent_id: Option<Uuid>,
    /// User the request acts for.
    pub user_id: Option<UserId>,
    /// Action class being attempted.
    pub action_class: Option<ActionClass>,
    /// Operation name (`execute_proxy_action`, `execute_rollback`, ...).
    pub operation: Option<String>,
    /// When the request started.
    pub started_at: DateTime<Utc>,
}

impl RequestContext {
    /// A fresh context whose correlation id equals its request id.
    #[must_use]
    pub fn new() -> Self {
        let id = Uuid::new_v4();
        Self {
            request_id: id,
            correlation_id: id,
            parent_id: None,
            user_id: None,
            action_class: None,
            operation: None,
            started_at: Utc::now(),
        }
    }

    /// A sub-request sharing this context's correlation id and user.
    #[must_use]
    pub fn child(&self, operation: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            correlation_id: self.correlation_id,
            parent_id: Some(self.request_id),
            user_id: self.user_id.clone(),
            action_class: self.action_class.clone(),
            operation: Some(operation.into()),
            started_at: Utc::now(),
        }
    }

    /// Adopt an upstream correlation id.
    #[must_use]
    pub fn with_correlation_id(mut self, id: Uuid) -> Self {
        self.correlation_id = id;
        self
    }

    /// Set the user.
    #[must_use]
    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Set the action class.
    #[must_use]
    pub fn with_action_class(mut self, action_class: ActionClass) -> Self {
        self.action_class = Some(action_class);
        self
    }

    /// Set the operation name.
    #[must_use]
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Milliseconds since the request started.
    #[must_use]
    pub fn elapsed_ms(&self) -> i64 {
        Utc::now()
            .signed_duration_since(self.started_at)
            .num_milliseconds()
    }

    /// A span carrying the correlation fields.
    #[must_use]
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "request",
            request_id = %self.request_id,
            correlation_id = %self.correlation_id,
            user_id = self.user_id.as_ref().map(UserId::as_str),
            action_class = self.action_class.as_ref().map(ActionClass::as_str),
            operation = self.operation.as_deref(),
        )
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
