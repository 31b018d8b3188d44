//! Common identifier and time types used throughout Warrant.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Free-form key/value metadata attached to grants, checks and actions.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier. Identifiers created later in the
            /// same process compare greater.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Create an identifier from a UUID.
            #[must_use]
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for an authorization grant.
    AuthorizationId,
    "authz"
);

uuid_id!(
    /// Unique identifier for an audit log entry.
    AuditEntryId,
    "audit"
);

uuid_id!(
    /// Unique identifier for a rollback attempt.
    RollbackId,
    "rollback"
);

uuid_id!(
    /// Unique identifier for a consent history entry.
    ConsentEntryId,
    "consent"
);

/// Identifier of the end user on whose behalf actions are taken.
///
/// User identities are minted by the host (account system, `OAuth`
/// subject, ...), so this is an opaque string rather than a UUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Create a user ID from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Timestamp wrapper for consistent handling throughout Warrant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    /// Get the current wall-clock timestamp.
    ///
    /// Services should prefer an injected [`Clock`](crate::Clock).
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Create a timestamp from a `DateTime<Utc>`.
    #[must_use]
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Check whether this timestamp lies strictly before `now`.
    #[must_use]
    pub fn is_before(&self, now: Timestamp) -> bool {
        self.0 < now.0
    }

    /// Add a duration, saturating at the representable maximum.
    #[must_use]
    pub fn saturating_add(self, duration: Duration) -> Self {
        Self(
            self.0
                .checked_add_signed(duration)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        )
    }

    /// Subtract a duration, saturating at the representable minimum.
    #[must_use]
    pub fn saturating_sub(self, duration: Duration) -> Self {
        Self(
            self.0
                .checked_sub_signed(duration)
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
        )
    }

    /// Microseconds since the Unix epoch, used for ordered storage keys.
    #[must_use]
    pub fn timestamp_micros(&self) -> i64 {
        self.0.timestamp_micros()
    }

    /// Get the inner `DateTime<Utc>`.
    #[must_use]
    pub fn into_inner(self) -> DateTime<Utc> {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%dT%H:%M:%SZ"))
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

impl From<Timestamp> for DateTime<Utc> {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

/// Convert a `[0, 1]` confidence score into an integer percentage.
///
/// Out-of-range values are clamped; non-finite values yield `None`.
#[must_use]
pub fn confidence_percent(confidence: f64) -> Option<u8> {
    if !confidence.is_finite() {
        return None;
    }
    let clamped = confidence.clamp(0.0, 1.0);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let percent = (clamped * 100.0).round() as u8;
    Some(percent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_and_prefixed() {
        let a = AuthorizationId::new();
        let b = AuthorizationId::new();
        assert_ne!(a, b);
        assert!(a.to_string().starts_with("authz:"));
        assert!(AuditEntryId::new().to_string().starts_with("audit:"));
        assert!(RollbackId::new().to_string().starts_with("rollback:"));
    }

    #[test]
    fn test_ids_sort_in_creation_order() {
        let ids: Vec<ConsentEntryId> = (0..64).map(|_| ConsentEntryId::new()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(sorted, ids);
    }

    #[test]
    fn test_user_id_is_transparent_in_json() {
        let id = UserId::new("user-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"user-1\"");
    }

    #[test]
    fn test_timestamp_arithmetic_saturates() {
        let max = Timestamp::from_datetime(DateTime::<Utc>::MAX_UTC);
        assert_eq!(max.saturating_add(Duration::hours(1)), max);
        let min = Timestamp::from_datetime(DateTime::<Utc>::MIN_UTC);
        assert_eq!(min.saturating_sub(Duration::hours(1)), min);
    }

    #[test]
    fn test_confidence_percent() {
        assert_eq!(confidence_percent(0.95), Some(95));
        assert_eq!(confidence_percent(0.92), Some(92));
        assert_eq!(confidence_percent(1.7), Some(100));
        assert_eq!(confidence_percent(-0.2), Some(0));
        assert_eq!(confidence_percent(f64::NAN), None);
    }
}
