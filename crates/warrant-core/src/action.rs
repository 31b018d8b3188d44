//! Action classes and the static per-class rollback table.
//!
//! An [`ActionClass`] is the coarse category of an effectful operation the
//! assistant can perform (`send_email`, `create_calendar_event`, ...). Each
//! class maps onto a derived [`ActionType`] and onto a [`RollbackStrategy`]
//! through data-driven lookups; there is no per-class type hierarchy.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse category of effectful operation.
///
/// Unknown classes round-trip through [`ActionClass::Other`] so that grants
/// and audit entries written by newer hosts are never rejected, but an
/// unknown class never supports rollback.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionClass {
    /// Send an email on the user's behalf.
    SendEmail,
    /// Create a calendar event.
    CreateCalendarEvent,
    /// Update an existing calendar event.
    UpdateCalendarEvent,
    /// Delete a calendar event.
    DeleteCalendarEvent,
    /// File a GitHub issue.
    CreateGithubIssue,
    /// Update a GitHub issue.
    UpdateGithubIssue,
    /// Post a Slack message.
    PostSlackMessage,
    /// Create a task.
    CreateTask,
    /// Update a task.
    UpdateTask,
    /// Any class not known to this build.
    Other(String),
}

impl ActionClass {
    /// Every class known to this build, in table order.
    pub const KNOWN: [ActionClass; 9] = [
        Self::SendEmail,
        Self::CreateCalendarEvent,
        Self::UpdateCalendarEvent,
        Self::DeleteCalendarEvent,
        Self::CreateGithubIssue,
        Self::UpdateGithubIssue,
        Self::PostSlackMessage,
        Self::CreateTask,
        Self::UpdateTask,
    ];

    /// The wire name of this class.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::SendEmail => "send_email",
            Self::CreateCalendarEvent => "create_calendar_event",
            Self::UpdateCalendarEvent => "update_calendar_event",
            Self::DeleteCalendarEvent => "delete_calendar_event",
            Self::CreateGithubIssue => "create_github_issue",
            Self::UpdateGithubIssue => "update_github_issue",
            Self::PostSlackMessage => "post_slack_message",
            Self::CreateTask => "create_task",
            Self::UpdateTask => "update_task",
            Self::Other(name) => name,
        }
    }

    /// Parse a wire name. Never fails; unknown names become [`ActionClass::Other`].
    #[must_use]
    pub fn parse(name: &str) -> Self {
        Self::KNOWN
            .iter()
            .find(|c| c.as_str() == name)
            .cloned()
            .unwrap_or_else(|| Self::Other(name.to_string()))
    }

    /// The derived action type (service family) of this class.
    #[must_use]
    pub fn action_type(&self) -> ActionType {
        match self {
            Self::SendEmail => ActionType::Email,
            Self::CreateCalendarEvent | Self::UpdateCalendarEvent | Self::DeleteCalendarEvent => {
                ActionType::Calendar
            },
            Self::CreateGithubIssue | Self::UpdateGithubIssue => ActionType::Github,
            Self::PostSlackMessage => ActionType::Slack,
            Self::CreateTask | Self::UpdateTask => ActionType::Task,
            Self::Other(name) => ActionType::infer(name),
        }
    }

    /// The rollback strategy for this class.
    #[must_use]
    pub fn rollback_strategy(&self) -> RollbackStrategy {
        RollbackStrategy::for_action_class(self)
    }
}

impl fmt::Display for ActionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ActionClass {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<&str> for ActionClass {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<ActionClass> for String {
    fn from(c: ActionClass) -> Self {
        c.as_str().to_string()
    }
}

/// Service family an action class belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Email (Gmail and friends).
    Email,
    /// Calendar events.
    Calendar,
    /// GitHub issues.
    Github,
    /// Slack messages.
    Slack,
    /// Task management.
    Task,
    /// Not recognised.
    Other,
}

impl ActionType {
    /// Guess the family of an unknown class from its name.
    fn infer(name: &str) -> Self {
        if name.contains("email") {
            Self::Email
        } else if name.contains("calendar") {
            Self::Calendar
        } else if name.contains("github") {
            Self::Github
        } else if name.contains("slack") {
            Self::Slack
        } else if name.contains("task") {
            Self::Task
        } else {
            Self::Other
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Email => write!(f, "email"),
            Self::Calendar => write!(f, "calendar"),
            Self::Github => write!(f, "github"),
            Self::Slack => write!(f, "slack"),
            Self::Task => write!(f, "task"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Mechanism class for undoing an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollbackStrategy {
    /// The created resource can simply be deleted.
    DirectUndo,
    /// A compensating operation restores the prior state.
    Compensating,
    /// A human has to undo it.
    Manual,
    /// The effect cannot be taken back (sent mail, posted messages).
    NotSupported,
}

/// Static action-class → strategy table.
const STRATEGY_TABLE: [(ActionClass, RollbackStrategy); 9] = [
    (ActionClass::CreateCalendarEvent, RollbackStrategy::DirectUndo),
    (ActionClass::CreateTask, RollbackStrategy::DirectUndo),
    (ActionClass::CreateGithubIssue, RollbackStrategy::DirectUndo),
    (ActionClass::UpdateCalendarEvent, RollbackStrategy::Compensating),
    (ActionClass::UpdateTask, RollbackStrategy::Compensating),
    (ActionClass::UpdateGithubIssue, RollbackStrategy::Compensating),
    (ActionClass::DeleteCalendarEvent, RollbackStrategy::Compensating),
    (ActionClass::SendEmail, RollbackStrategy::NotSupported),
    (ActionClass::PostSlackMessage, RollbackStrategy::NotSupported),
];

impl RollbackStrategy {
    /// Look up the strategy for an action class. Unknown classes are
    /// [`RollbackStrategy::NotSupported`].
    #[must_use]
    pub fn for_action_class(action_class: &ActionClass) -> Self {
        STRATEGY_TABLE
            .iter()
            .find(|(class, _)| class == action_class)
            .map_or(Self::NotSupported, |(_, strategy)| *strategy)
    }

    /// Whether an action with this strategy can be rolled back at all.
    #[must_use]
    pub fn is_supported(self) -> bool {
        !matches!(self, Self::NotSupported)
    }
}

impl fmt::Display for RollbackStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DirectUndo => write!(f, "direct_undo"),
            Self::Compensating => write!(f, "compensating"),
            Self::Manual => write!(f, "manual"),
            Self::NotSupported => write!(f, "not_supported"),
        }
    }
}
