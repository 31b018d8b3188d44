//! Policy evaluation for one grant.
//!
//! Clauses are independent and ANDed within a grant. The first failing
//! clause produces the denial reason for that grant.

use async_trait::async_trait;
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warrant_audit::AuditService;
use warrant_core::{
    ActionClass, Clock, Metadata, Timestamp, UserId, start_of_local_day, start_of_local_week,
};

use crate::authorization::{AllowedHours, Authorization, Conditions};
use crate::error::AuthzResult;

/// Metadata key carrying the email recipient(s) of an action.
pub const RECIPIENT_KEY: &str = "recipient";
/// Metadata key carrying the calendar of an action.
pub const CALENDAR_KEY: &str = "calendarId";

/// How an allowed-hours window with `start > end` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoursWindowMode {
    /// `start <= hour < end` only. A window such as 22→2 admits nothing.
    #[default]
    NonWrapping,
    /// A window with `start > end` crosses midnight.
    WrapMidnight,
}

impl AllowedHours {
    /// Whether `hour` (0–23, local) falls inside the window.
    #[must_use]
    pub fn contains(&self, hour: u32, mode: HoursWindowMode) -> bool {
        let wraps = mode == HoursWindowMode::WrapMidnight && self.start >= self.end;
        if !wraps {
            return self.start <= hour && hour < self.end;
        }
        self.start == self.end || hour >= self.start || hour < self.end
    }
}

/// Counts past successful actions for the per-day and per-week limits.
#[async_trait]
pub trait ActionCounter: Send + Sync {
    /// Successful actions of `action_class` by `user_id` at or after `since`.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger cannot be read.
    async fn successful_since(
        &self,
        user_id: &UserId,
        action_class: &ActionClass,
        since: Timestamp,
    ) -> AuthzResult<u64>;
}

#[async_trait]
impl ActionCounter for AuditService {
    async fn successful_since(
        &self,
        user_id: &UserId,
        action_class: &ActionClass,
        since: Timestamp,
    ) -> AuthzResult<u64> {
        Ok(self
            .count_successful_since(user_id, action_class, since)
            .await?)
    }
}

/// Outcome of evaluating one grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Verdict {
    Pass,
    Deny(String),
}

/// Evaluates the conditions of candidate grants.
pub(crate) struct PolicyEvaluator {
    pub(crate) counter: Arc<dyn ActionCounter>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) hours_mode: HoursWindowMode,
    pub(crate) week_start: Weekday,
}

impl PolicyEvaluator {
    pub(crate) async fn evaluate(
        &self,
        authorization: &Authorization,
        confidence: Option<f64>,
        metadata: &Metadata,
    ) -> AuthzResult<Verdict> {
        let conditions = &authorization.conditions;

        if let Some(reason) = self.static_denial(conditions, confidence, metadata) {
            return Ok(Verdict::Deny(reason));
        }

        if let Some(max) = conditions.max_actions_per_day {
            let since = start_of_local_day(self.clock.as_ref());
            if let Some(reason) = self
                .limit_denial(authorization, since, max, "Daily")
                .await?
            {
                return Ok(Verdict::Deny(reason));
            }
        }
        if let Some(max) = conditions.max_actions_per_week {
            let since = start_of_local_week(self.clock.as_ref(), self.week_start);
            if let Some(reason) = self
                .limit_denial(authorization, since, max, "Weekly")
                .await?
            {
                return Ok(Verdict::Deny(reason));
            }
        }

        Ok(Verdict::Pass)
    }

    /// Clauses that need no I/O.
    fn static_denial(
        &self,
        conditions: &Conditions,
        confidence: Option<f64>,
        metadata: &Metadata,
    ) -> Option<String> {
        if let Some(threshold) = conditions.require_confidence_threshold {
            match confidence {
                None => {
                    return Some(format!(
                        "Confidence score required (threshold {threshold})"
                    ));
                },
                Some(c) if c.is_nan() || threshold.is_nan() || c < threshold => {
                    return Some(format!(
                        "Confidence {c} below threshold {threshold}"
                    ));
                },
                Some(_) => {},
            }
        }

        if let Some(hours) = conditions.allowed_hours {
            let hour = self.clock.local_hour();
            if !hours.contains(hour, self.hours_mode) {
                return Some(format!(
                    "Outside allowed hours ({hours}); local hour is {hour:02}"
                ));
            }
        }

        if let Some(allowed) = &conditions.allowed_recipients {
            match metadata_strings(metadata, RECIPIENT_KEY) {
                None => return Some("Recipient required by whitelist but not provided".to_string()),
                Some(recipients) => {
                    if let Some(bad) = recipients
                        .iter()
                        .find(|r| !allowed.iter().any(|a| a.trim().eq_ignore_ascii_case(r.trim())))
                    {
                        return Some(format!("Recipient {bad} not in whitelist"));
                    }
                },
            }
        }

        if let Some(allowed) = &conditions.allowed_calendars {
            match metadata_strings(metadata, CALENDAR_KEY) {
                None => return Some("Calendar required by whitelist but not provided".to_string()),
                Some(calendars) => {
                    if let Some(bad) = calendars.iter().find(|c| !allowed.contains(c)) {
                        return Some(format!("Calendar {bad} not in whitelist"));
                    }
                },
            }
        }

        None
    }

    async fn limit_denial(
        &self,
        authorization: &Authorization,
        since: Timestamp,
        max: u32,
        period: &str,
    ) -> AuthzResult<Option<String>> {
        let count = self
            .counter
            .successful_since(&authorization.user_id, &authorization.action_class, since)
            .await?;
        if count >= u64::from(max) {
            return Ok(Some(format!(
                "{period} limit reached ({count}/{max} {} actions)",
                authorization.action_class
            )));
        }
        Ok(None)
    }
}

/// Read a metadata field as one or more non-empty strings.
fn metadata_strings(metadata: &Metadata, key: &str) -> Option<Vec<String>> {
    let values: Vec<String> = match metadata.get(key)? {
        serde_json::Value::String(s) => vec![s.clone()],
        serde_json::Value::Array(items) => items
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()?,
        _ => return None,
    };
    if values.is_empty() || values.iter().any(|v| v.trim().is_empty()) {
        return None;
    }
    Some(values)
}
