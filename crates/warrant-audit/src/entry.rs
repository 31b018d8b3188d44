//! Audit entry types.
//!
//! Every attempted action, whether gated by an authorization (proxy mode) or not
//! (assistant mode), is recorded as exactly one immutable [`AuditEntry`].

use serde::{Deserialize, Serialize};
use std::fmt;
use warrant_core::{
    ActionClass, AuditEntryId, AuthorizationId, RollbackStrategy, Timestamp, UserId,
    confidence_percent,
};

/// Key under which the computed rollback eligibility is stored in the output.
pub const ROLLBACK_ELIGIBLE_KEY: &str = "_rollbackEligible";

/// How the assistant was operating when it took the action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionMode {
    /// Drafting or suggesting on the user's screen; not authorization-gated.
    Assistant,
    /// Acting on the user's behalf under an authorization grant.
    Proxy,
}

impl fmt::Display for ActionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Assistant => write!(f, "assistant"),
            Self::Proxy => write!(f, "proxy"),
        }
    }
}

/// A single audit log entry. Never updated or deleted once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unique entry identifier.
    pub id: AuditEntryId,
    /// User the action was taken for.
    pub user_id: UserId,
    /// Authorization that admitted the action (`None` in assistant mode).
    pub authorization_id: Option<AuthorizationId>,
    /// Human description of the action.
    pub action: String,
    /// Class of the action.
    pub action_class: ActionClass,
    /// Operating mode.
    pub mode: ActionMode,
    /// Persona the assistant was acting as.
    pub persona: Option<String>,
    /// Input the action was performed with.
    pub input: serde_json::Value,
    /// Provider output, augmented with [`ROLLBACK_ELIGIBLE_KEY`].
    pub output: serde_json::Value,
    /// Model that proposed the action.
    pub model_used: Option<String>,
    /// Confidence as an integer percentage (0–100).
    pub confidence: Option<u8>,
    /// Tokens spent proposing the action.
    pub tokens_used: Option<u64>,
    /// End-to-end latency of the action.
    pub latency_ms: Option<u64>,
    /// Whether the action succeeded.
    pub success: bool,
    /// Failure description, if any.
    pub error: Option<String>,
    /// Whether the user explicitly confirmed this action.
    pub user_confirmed: bool,
    /// When the user confirmed it.
    pub confirmed_at: Option<Timestamp>,
    /// When the entry was recorded.
    pub timestamp: Timestamp,
}

impl AuditEntry {
    /// Whether this entry was marked eligible for rollback when it was logged.
    #[must_use]
    pub fn rollback_eligible(&self) -> bool {
        self.output
            .get(ROLLBACK_ELIGIBLE_KEY)
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }

    /// The provider output with the eligibility marker stripped.
    #[must_use]
    pub fn original_output(&self) -> serde_json::Value {
        match &self.output {
            serde_json::Value::Object(map) => {
                let mut map = map.clone();
                map.remove(ROLLBACK_ELIGIBLE_KEY);
                match map.remove(WRAPPED_VALUE_KEY) {
                    Some(inner) if map.is_empty() => inner,
                    Some(inner) => {
                        map.insert(WRAPPED_VALUE_KEY.to_string(), inner);
                        serde_json::Value::Object(map)
                    },
                    None if map.is_empty() => serde_json::Value::Null,
                    None => serde_json::Value::Object(map),
                }
            },
            other => other.clone(),
        }
    }
}

/// Key used to carry a non-object provider output inside the augmented output.
const WRAPPED_VALUE_KEY: &str = "value";

/// Attach the eligibility marker to a provider output.
///
/// Objects gain the key in place; `null` becomes an object holding only the
/// marker; any other value is wrapped under `"value"`.
pub(crate) fn augment_output(output: serde_json::Value, eligible: bool) -> serde_json::Value {
    let mut map = match output {
        serde_json::Value::Object(map) => map,
        serde_json::Value::Null => serde_json::Map::new(),
        other => {
            let mut map = serde_json::Map::new();
            map.insert(WRAPPED_VALUE_KEY.to_string(), other);
            map
        },
    };
    map.insert(
        ROLLBACK_ELIGIBLE_KEY.to_string(),
        serde_json::Value::Bool(eligible),
    );
    serde_json::Value::Object(map)
}

/// Eligibility rule: the action succeeded and its class supports rollback.
#[must_use]
pub fn is_rollback_eligible(success: bool, action_class: &ActionClass) -> bool {
    success && RollbackStrategy::for_action_class(action_class).is_supported()
}

/// Parameters of one action attempt, as reported by the caller.
///
/// # Example
///
/// ```
/// use warrant_audit::ActionRecord;
/// use warrant_core::{ActionClass, AuthorizationId, UserId};
///
/// let record = ActionRecord::new(UserId::new("u1"), ActionClass::CreateTask, "Create task")
///     .with_authorization(AuthorizationId::new())
///     .with_confidence(0.93)
///     .succeeded(serde_json::json!({ "taskId": "t-1" }));
/// assert!(record.success);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRecord {
    /// User the action was taken for.
    pub user_id: UserId,
    /// Authorization that admitted the action.
    pub authorization_id: Option<AuthorizationId>,
    /// Human description of the action.
    pub action: String,
    /// Class of the action.
    pub action_class: ActionClass,
    /// Persona the assistant was acting as.
    pub persona: Option<String>,
    /// Input the action was performed with.
    pub input: serde_json::Value,
    /// Provider output.
    pub output: serde_json::Value,
    /// Model that proposed the action.
    pub model_used: Option<String>,
    /// Confidence score in `[0, 1]`.
    pub confidence: Option<f64>,
    /// Tokens spent.
    pub tokens_used: Option<u64>,
    /// Latency of the action.
    pub latency_ms: Option<u64>,
    /// Whether the action succeeded.
    pub success: bool,
    /// Failure description.
    pub error: Option<String>,
    /// Whether the user explicitly confirmed the action.
    pub user_confirmed: bool,
}

impl ActionRecord {
    /// Start a record for an action that has not been reported on yet.
    ///
    /// Defaults to a failed outcome until [`succeeded`](Self::succeeded) or
    /// [`failed`](Self::failed) is called.
    #[must_use]
    pub fn new(user_id: UserId, action_class: ActionClass, action: impl Into<String>) -> Self {
        Self {
            user_id,
            authorization_id: None,
            action: action.into(),
            action_class,
            persona: None,
            input: serde_json::Value::Null,
            output: serde_json::Value::Null,
            model_used: None,
            confidence: None,
            tokens_used: None,
            latency_ms: None,
            success: false,
            error: None,
            user_confirmed: false,
        }
    }

    /// Attach the authorization that admitted the action.
    #[must_use]
    pub fn with_authorization(mut self, id: AuthorizationId) -> Self {
        self.authorization_id = Some(id);
        self
    }

    /// Set the action input.
    #[must_use]
    pub fn with_input(mut self, input: serde_json::Value) -> Self {
        self.input = input;
        self
    }

    /// Set the persona.
    #[must_use]
    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = Some(persona.into());
        self
    }

    /// Set the model that proposed the action.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model_used = Some(model.into());
        self
    }

    /// Set the `[0, 1]` confidence score.
    #[must_use]
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Set the token usage.
    #[must_use]
    pub fn with_tokens(mut self, tokens: u64) -> Self {
        self.tokens_used = Some(tokens);
        self
    }

    /// Set the latency.
    #[must_use]
    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        self.latency_ms = Some(latency_ms);
        self
    }

    /// Mark the action as explicitly confirmed by the user.
    #[must_use]
    pub fn confirmed(mut self) -> Self {
        self.user_confirmed = true;
        self
    }

    /// Record a successful outcome.
    #[must_use]
    pub fn succeeded(mut self, output: serde_json::Value) -> Self {
        self.success = true;
        self.output = output;
        self.error = None;
        self
    }

    /// Record a failed outcome.
    #[must_use]
    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }

    /// Turn the record into an immutable entry at `now`.
    pub(crate) fn into_entry(self, mode: ActionMode, now: Timestamp) -> AuditEntry {
        let eligible = is_rollback_eligible(self.success, &self.action_class);
        AuditEntry {
            id: AuditEntryId::new(),
            user_id: self.user_id,
            authorization_id: self.authorization_id,
            action: self.action,
            action_class: self.action_class,
            mode,
            persona: self.persona,
            input: self.input,
            output: augment_output(self.output, eligible),
            model_used: self.model_used,
            confidence: self.confidence.and_then(confidence_percent),
            tokens_used: self.tokens_used,
            latency_ms: self.latency_ms,
            success: self.success,
            error: self.error,
            user_confirmed: self.user_confirmed,
            confirmed_at: self.user_confirmed.then_some(now),
            timestamp: now,
        }
    }
}
