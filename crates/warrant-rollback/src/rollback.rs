//! Rollback records and the data captured for undo.

use serde::{Deserialize, Serialize};
use std::fmt;
use warrant_audit::AuditEntry;
use warrant_core::{
    ActionClass, ActionType, AuditEntryId, RollbackData, RollbackId, RollbackStrategy, Timestamp,
    UserId,
};

/// Lifecycle of a rollback attempt.
///
/// `pending → in_progress → {completed | failed}`; the last two are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollbackStatus {
    /// Created, undo not yet invoked.
    Pending,
    /// Undo invoked, awaiting its outcome.
    InProgress,
    /// Undo succeeded.
    Completed,
    /// Undo failed, timed out or was cancelled.
    Failed,
}

impl RollbackStatus {
    /// Whether no further transition is possible.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for RollbackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A compensation attempt against one audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rollback {
    /// Unique identifier.
    pub id: RollbackId,
    /// Entry being reversed.
    pub audit_entry_id: AuditEntryId,
    /// Owner of the entry.
    pub user_id: UserId,
    /// Class of the reversed action.
    pub action_class: ActionClass,
    /// How it is reversed.
    pub strategy: RollbackStrategy,
    /// Current state.
    pub status: RollbackStatus,
    /// Captured input, output and undo instructions.
    pub rollback_data: RollbackData,
    /// Why the user asked for the rollback.
    pub reason: Option<String>,
    /// Failure description.
    pub error_message: Option<String>,
    /// When the rollback reached `completed`.
    pub completed_at: Option<Timestamp>,
    /// End of the rollback window of the entry.
    pub expires_at: Timestamp,
    /// When the rollback was requested.
    pub created_at: Timestamp,
    /// Latest moment the undo may still be running. An `in_progress` record
    /// past it was abandoned.
    pub deadline: Timestamp,
}

impl Rollback {
    pub(crate) fn start(
        entry: &AuditEntry,
        strategy: RollbackStrategy,
        reason: Option<String>,
        expires_at: Timestamp,
        now: Timestamp,
        deadline: Timestamp,
    ) -> Self {
        Self {
            id: RollbackId::new(),
            audit_entry_id: entry.id.clone(),
            user_id: entry.user_id.clone(),
            action_class: entry.action_class.clone(),
            strategy,
            status: RollbackStatus::InProgress,
            rollback_data: rollback_data_for(entry, strategy),
            reason,
            error_message: None,
            completed_at: None,
            expires_at,
            created_at: now,
            deadline,
        }
    }

    /// Whether the record is `in_progress` past its deadline.
    pub(crate) fn is_stale(&self, now: Timestamp) -> bool {
        self.status == RollbackStatus::InProgress && self.deadline.is_before(now)
    }

    pub(crate) fn complete(&mut self, now: Timestamp) {
        self.status = RollbackStatus::Completed;
        self.completed_at = Some(now);
        self.error_message = None;
    }

    pub(crate) fn fail(&mut self, message: impl Into<String>) {
        self.status = RollbackStatus::Failed;
        self.error_message = Some(message.into());
    }
}

/// Read-only answer to "can this entry be rolled back?".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackEligibility {
    /// Whether a rollback would be admitted.
    pub can_rollback: bool,
    /// Strategy for the entry's class.
    pub strategy: RollbackStrategy,
    /// Why not.
    pub reason: Option<String>,
    /// End of the rollback window, when the entry exists.
    pub expires_at: Option<Timestamp>,
}

impl RollbackEligibility {
    pub(crate) fn denied(
        strategy: RollbackStrategy,
        reason: impl Into<String>,
        expires_at: Option<Timestamp>,
    ) -> Self {
        Self {
            can_rollback: false,
            strategy,
            reason: Some(reason.into()),
            expires_at,
        }
    }
}

/// Answer to "did this rollback take effect?".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackVerification {
    /// `true` iff the rollback completed.
    pub verified: bool,
    /// Human-readable status.
    pub message: String,
}

/// Output keys that identify the created or modified resource, per family.
fn resource_keys(action_type: ActionType) -> &'static [&'static str] {
    match action_type {
        ActionType::Calendar => &["eventId", "id"],
        ActionType::Task => &["taskId", "id"],
        ActionType::Github => &["issueNumber", "number", "id"],
        ActionType::Email => &["messageId", "id"],
        ActionType::Slack => &["ts", "messageId", "id"],
        ActionType::Other => &["id"],
    }
}

fn resource_id(entry: &AuditEntry, output: &serde_json::Value) -> Option<String> {
    resource_keys(entry.action_class.action_type())
        .iter()
        .find_map(|key| match output.get(*key)? {
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

fn instructions(action_class: &ActionClass, strategy: RollbackStrategy, resource: &str) -> String {
    match (strategy, action_class) {
        (RollbackStrategy::DirectUndo, ActionClass::CreateCalendarEvent) => {
            format!("Delete calendar event {resource}")
        },
        (RollbackStrategy::DirectUndo, ActionClass::CreateTask) => format!("Delete task {resource}"),
        (RollbackStrategy::DirectUndo, ActionClass::CreateGithubIssue) => {
            format!("Close GitHub issue {resource}")
        },
        (RollbackStrategy::DirectUndo, other) => format!("Delete the resource created by {other}"),
        (RollbackStrategy::Compensating, ActionClass::DeleteCalendarEvent) => {
            "Recreate the deleted calendar event from the original input".to_string()
        },
        (RollbackStrategy::Compensating, other) => {
            format!("Restore the state of {resource} from before {other}")
        },
        (RollbackStrategy::Manual, other) => format!("Manually reverse {other}"),
        (RollbackStrategy::NotSupported, other) => format!("{other} cannot be undone"),
    }
}

/// Capture everything an undo handler needs from an audit entry.
#[must_use]
pub fn rollback_data_for(entry: &AuditEntry, strategy: RollbackStrategy) -> RollbackData {
    let original_output = entry.original_output();
    let resource_id = resource_id(entry, &original_output);
    let instructions = instructions(
        &entry.action_class,
        strategy,
        resource_id.as_deref().unwrap_or("the affected resource"),
    );
    RollbackData {
        original_input: entry.input.clone(),
        original_output,
        strategy,
        resource_id,
        instructions,
    }
}
