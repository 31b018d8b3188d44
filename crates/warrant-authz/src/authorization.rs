//! Authorization records and grant requests.

use serde::{Deserialize, Serialize};
use std::fmt;
use warrant_core::{ActionClass, ActionType, AuthorizationId, Metadata, Timestamp, UserId};

/// Breadth or duration of a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// A single action.
    Single,
    /// Valid for the current session.
    Session,
    /// Valid until revoked or expired.
    Standing,
    /// Valid while its conditions hold.
    Conditional,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single => write!(f, "single"),
            Self::Session => write!(f, "session"),
            Self::Standing => write!(f, "standing"),
            Self::Conditional => write!(f, "conditional"),
        }
    }
}

/// How the user came to grant the authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantMethod {
    /// The user explicitly consented.
    ExplicitConsent,
    /// Learned from repeated confirmations.
    ImplicitLearning,
    /// Part of a bulk grant.
    BulkGrant,
}

impl fmt::Display for GrantMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExplicitConsent => write!(f, "explicit_consent"),
            Self::ImplicitLearning => write!(f, "implicit_learning"),
            Self::BulkGrant => write!(f, "bulk_grant"),
        }
    }
}

/// Local-time hour window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowedHours {
    /// First allowed hour (0–23).
    pub start: u32,
    /// First hour no longer allowed (1–24).
    pub end: u32,
}

impl AllowedHours {
    /// Create a window.
    #[must_use]
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }
}

impl fmt::Display for AllowedHours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:00-{:02}:00", self.start, self.end)
    }
}

/// Optional policy clauses attached to a grant.
///
/// Every clause that is set must pass for the grant to admit an action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Conditions {
    /// Minimum confidence in `[0, 1]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require_confidence_threshold: Option<f64>,
    /// Maximum successful actions of this class per local day.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_actions_per_day: Option<u32>,
    /// Maximum successful actions of this class per local week.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_actions_per_week: Option<u32>,
    /// Local-time hour window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_hours: Option<AllowedHours>,
    /// Email recipients the grant covers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_recipients: Option<Vec<String>>,
    /// Calendars the grant covers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_calendars: Option<Vec<String>>,
}

impl Conditions {
    /// No conditions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a minimum confidence.
    #[must_use]
    pub fn confidence_threshold(mut self, threshold: f64) -> Self {
        self.require_confidence_threshold = Some(threshold);
        self
    }

    /// Cap successful actions per local day.
    #[must_use]
    pub fn max_per_day(mut self, max: u32) -> Self {
        self.max_actions_per_day = Some(max);
        self
    }

    /// Cap successful actions per local week.
    #[must_use]
    pub fn max_per_week(mut self, max: u32) -> Self {
        self.max_actions_per_week = Some(max);
        self
    }

    /// Restrict to a local hour window.
    #[must_use]
    pub fn hours(mut self, start: u32, end: u32) -> Self {
        self.allowed_hours = Some(AllowedHours::new(start, end));
        self
    }

    /// Restrict email actions to these recipients.
    #[must_use]
    pub fn recipients<I, S>(mut self, recipients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_recipients = Some(recipients.into_iter().map(Into::into).collect());
        self
    }

    /// Restrict calendar actions to these calendars.
    #[must_use]
    pub fn calendars<I, S>(mut self, calendars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_calendars = Some(calendars.into_iter().map(Into::into).collect());
        self
    }

    /// Whether no clause is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// A grant of permission for one action class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Authorization {
    /// Unique identifier.
    pub id: AuthorizationId,
    /// User the grant belongs to.
    pub user_id: UserId,
    /// Action class the grant covers.
    pub action_class: ActionClass,
    /// Service family of the action class.
    pub action_type: ActionType,
    /// Breadth or duration.
    pub scope: Scope,
    /// Policy clauses.
    pub conditions: Conditions,
    /// How the grant was made.
    pub grant_method: GrantMethod,
    /// When it was granted.
    pub granted_at: Timestamp,
    /// When it stops being valid (`None` = never).
    pub expires_at: Option<Timestamp>,
    /// When it was revoked.
    pub revoked_at: Option<Timestamp>,
    /// Free-form metadata.
    pub metadata: Metadata,
}

impl Authorization {
    /// Active iff not revoked and not past its expiry.
    #[must_use]
    pub fn is_active(&self, now: Timestamp) -> bool {
        self.revoked_at.is_none() && !self.is_expired(now)
    }

    /// Whether `expires_at` has been reached.
    #[must_use]
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|expires| expires <= now)
    }

    /// Whether the grant has been revoked.
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }
}

/// Parameters of a new grant.
///
/// # Example
///
/// ```
/// use warrant_authz::{Conditions, GrantRequest, Scope};
/// use warrant_core::{ActionClass, ActionType, UserId};
///
/// let request = GrantRequest::new(UserId::new("u1"), ActionClass::SendEmail)
///     .with_scope(Scope::Standing)
///     .with_conditions(Conditions::new().confidence_threshold(0.9));
/// assert_eq!(request.action_type, ActionType::Email);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct GrantRequest {
    /// User the grant belongs to.
    pub user_id: UserId,
    /// Action class to grant.
    pub action_class: ActionClass,
    /// Service family (defaults to the class's own).
    pub action_type: ActionType,
    /// Breadth or duration.
    pub scope: Scope,
    /// Policy clauses.
    pub conditions: Conditions,
    /// How the grant was made.
    pub grant_method: GrantMethod,
    /// Expiry.
    pub expires_at: Option<Timestamp>,
    /// Free-form metadata.
    pub metadata: Metadata,
}

impl GrantRequest {
    /// A standing, explicitly consented, unconditional grant.
    #[must_use]
    pub fn new(user_id: UserId, action_class: ActionClass) -> Self {
        let action_type = action_class.action_type();
        Self {
            user_id,
            action_class,
            action_type,
            scope: Scope::Standing,
            conditions: Conditions::default(),
            grant_method: GrantMethod::ExplicitConsent,
            expires_at: None,
            metadata: Metadata::new(),
        }
    }

    /// Override the action type.
    #[must_use]
    pub fn with_action_type(mut self, action_type: ActionType) -> Self {
        self.action_type = action_type;
        self
    }

    /// Set the scope.
    #[must_use]
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Set the conditions.
    #[must_use]
    pub fn with_conditions(mut self, conditions: Conditions) -> Self {
        self.conditions = conditions;
        self
    }

    /// Set the grant method.
    #[must_use]
    pub fn with_grant_method(mut self, grant_method: GrantMethod) -> Self {
        self.grant_method = grant_method;
        self
    }

    /// Set the expiry.
    #[must_use]
    pub fn expires_at(mut self, expires_at: Timestamp) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Set the metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub(crate) fn into_authorization(self, now: Timestamp) -> Authorization {
        Authorization {
            id: AuthorizationId::new(),
            user_id: self.user_id,
            action_class: self.action_class,
            action_type: self.action_type,
            scope: self.scope,
            conditions: self.conditions,
            grant_method: self.grant_method,
            granted_at: now,
            expires_at: self.expires_at,
            revoked_at: None,
            metadata: self.metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn grant(expires_at: Option<Timestamp>) -> Authorization {
        let mut request = GrantRequest::new(UserId::new("u1"), ActionClass::CreateTask);
        request.expires_at = expires_at;
        request.into_authorization(Timestamp::now())
    }

    #[test]
    fn test_is_active() {
        let now = Timestamp::now();
        assert!(grant(None).is_active(now));
        assert!(grant(Some(now.saturating_add(Duration::minutes(1)))).is_active(now));
        assert!(!grant(Some(now)).is_active(now));
        assert!(!grant(Some(now.saturating_sub(Duration::minutes(1)))).is_active(now));

        let mut revoked = grant(None);
        revoked.revoked_at = Some(now);
        assert!(!revoked.is_active(now));
    }

    #[test]
    fn test_conditions_serialize_sparsely() {
        let conditions = Conditions::new().confidence_threshold(0.9);
        let json = serde_json::to_value(&conditions).unwrap();
        assert_eq!(json, serde_json::json!({ "require_confidence_threshold": 0.9 }));

        let back: Conditions = serde_json::from_value(json).unwrap();
        assert_eq!(back, conditions);
        assert!(Conditions::new().is_empty());
    }

    #[test]
    fn test_grant_request_derives_action_type() {
        let request = GrantRequest::new(UserId::new("u1"), ActionClass::CreateCalendarEvent);
        assert_eq!(request.action_type, ActionType::Calendar);
        assert_eq!(request.scope, Scope::Standing);
    }
}
