//! The audit service: records action attempts and answers ledger queries.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};
use warrant_core::{ActionClass, AuditEntryId, Clock, Timestamp, UserId};

use crate::entry::{ActionMode, ActionRecord, AuditEntry};
use crate::error::{AuditError, AuditResult};
use crate::storage::AuditStorage;

/// Tunables for ledger queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditSettings {
    /// Page size used when a query does not specify a limit.
    pub default_page_size: usize,
    /// Upper bound applied to any requested limit.
    pub max_page_size: usize,
    /// Default cap for [`AuditService::get_recent_failures`].
    pub recent_failures_limit: usize,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            default_page_size: 50,
            max_page_size: 500,
            recent_failures_limit: 10,
        }
    }
}

/// Filter and pagination for [`AuditService::get_audit_log`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditQuery {
    /// Only entries of this class.
    pub action_class: Option<ActionClass>,
    /// Only successful (`true`) or failed (`false`) entries.
    pub success: Option<bool>,
    /// Page size.
    pub limit: Option<usize>,
    /// Number of matching entries to skip.
    pub offset: Option<usize>,
}

impl AuditQuery {
    /// Restrict to one action class.
    #[must_use]
    pub fn action_class(mut self, action_class: ActionClass) -> Self {
        self.action_class = Some(action_class);
        self
    }

    /// Restrict by outcome.
    #[must_use]
    pub fn success(mut self, success: bool) -> Self {
        self.success = Some(success);
        self
    }

    /// Set the page size and offset.
    #[must_use]
    pub fn page(mut self, limit: usize, offset: usize) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }

    fn matches(&self, entry: &AuditEntry) -> bool {
        self.action_class
            .as_ref()
            .is_none_or(|class| &entry.action_class == class)
            && self.success.is_none_or(|success| entry.success == success)
    }
}

/// Aggregate view over a user's ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditStats {
    /// Number of recorded attempts.
    pub total_actions: u64,
    /// Attempts that succeeded.
    pub successful_actions: u64,
    /// Attempts that failed.
    pub failed_actions: u64,
    /// Attempts per action class.
    pub actions_by_class: BTreeMap<ActionClass, u64>,
    /// Attempts per operating mode.
    pub actions_by_mode: BTreeMap<ActionMode, u64>,
    /// Mean confidence percentage over entries that carry one (0 when none do).
    pub average_confidence: f64,
    /// Sum of token usage.
    pub total_tokens_used: u64,
}

/// Append-only ledger of every attempted action.
///
/// Every entry is written exactly once; there is no update or delete path.
pub struct AuditService {
    storage: Arc<dyn AuditStorage>,
    clock: Arc<dyn Clock>,
    settings: AuditSettings,
}

impl AuditService {
    /// Create an audit service.
    #[must_use]
    pub fn new(
        storage: Arc<dyn AuditStorage>,
        clock: Arc<dyn Clock>,
        settings: AuditSettings,
    ) -> Self {
        Self {
            storage,
            clock,
            settings,
        }
    }

    /// Record the outcome of an authorization-gated (proxy mode) action.
    ///
    /// Must be called exactly once per attempt. The returned entry has been
    /// durably stored, so it is immediately visible to rollback checks.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::InvalidRecord`] if the record carries no
    /// authorization, or a storage error if it cannot be persisted.
    pub async fn log_proxy_action(&self, record: ActionRecord) -> AuditResult<AuditEntry> {
        if record.authorization_id.is_none() {
            return Err(AuditError::InvalidRecord(
                "proxy actions must reference the authorization that admitted them".to_string(),
            ));
        }
        self.append(record, ActionMode::Proxy).await
    }

    /// Record an assistant-mode action that was not authorization-gated.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the entry cannot be persisted.
    pub async fn log_assistant_action(&self, record: ActionRecord) -> AuditResult<AuditEntry> {
        let mut record = record;
        record.authorization_id = None;
        self.append(record, ActionMode::Assistant).await
    }

    async fn append(&self, record: ActionRecord, mode: ActionMode) -> AuditResult<AuditEntry> {
        if record.action.trim().is_empty() {
            return Err(AuditError::InvalidRecord(
                "action description must not be empty".to_string(),
            ));
        }
        let entry = record.into_entry(mode, self.clock.now());
        self.storage.append(&entry).await?;

        info!(
            audit_entry_id = %entry.id,
            user_id = %entry.user_id,
            action_class = %entry.action_class,
            mode = %entry.mode,
            success = entry.success,
            rollback_eligible = entry.rollback_eligible(),
            "Action recorded"
        );
        Ok(entry)
    }

    /// Fetch one entry.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the lookup fails.
    pub async fn get_audit_entry(&self, id: &AuditEntryId) -> AuditResult<Option<AuditEntry>> {
        self.storage.get(id).await
    }

    /// A user's ledger, most recent first, filtered and paginated.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the ledger cannot be read.
    pub async fn get_audit_log(
        &self,
        user_id: &UserId,
        query: &AuditQuery,
    ) -> AuditResult<Vec<AuditEntry>> {
        let limit = query
            .limit
            .unwrap_or(self.settings.default_page_size)
            .min(self.settings.max_page_size);
        let offset = query.offset.unwrap_or(0);

        let entries = self.sorted_entries(user_id).await?;
        Ok(entries
            .into_iter()
            .filter(|e| query.matches(e))
            .skip(offset)
            .take(limit)
            .collect())
    }

    /// Aggregate statistics over a user's whole ledger.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the ledger cannot be read.
    pub async fn get_audit_stats(&self, user_id: &UserId) -> AuditResult<AuditStats> {
        let entries = self.storage.entries_for_user(user_id).await?;

        let mut stats = AuditStats::default();
        let mut confidence_sum: u64 = 0;
        let mut confidence_count: u64 = 0;

        for entry in &entries {
            stats.total_actions = stats.total_actions.saturating_add(1);
            if entry.success {
                stats.successful_actions = stats.successful_actions.saturating_add(1);
            } else {
                stats.failed_actions = stats.failed_actions.saturating_add(1);
            }
            let by_class = stats
                .actions_by_class
                .entry(entry.action_class.clone())
                .or_default();
            *by_class = by_class.saturating_add(1);
            let by_mode = stats.actions_by_mode.entry(entry.mode).or_default();
            *by_mode = by_mode.saturating_add(1);

            if let Some(confidence) = entry.confidence {
                confidence_sum = confidence_sum.saturating_add(u64::from(confidence));
                confidence_count = confidence_count.saturating_add(1);
            }
            if let Some(tokens) = entry.tokens_used {
                stats.total_tokens_used = stats.total_tokens_used.saturating_add(tokens);
            }
        }

        if confidence_count > 0 {
            #[allow(clippy::cast_precision_loss)]
            let average = confidence_sum as f64 / confidence_count as f64;
            stats.average_confidence = average;
        }

        debug!(user_id = %user_id, total = stats.total_actions, "Computed audit stats");
        Ok(stats)
    }

    /// Most recent failed attempts, capped at `limit` (or the configured default).
    ///
    /// # Errors
    ///
    /// Returns a storage error if the ledger cannot be read.
    pub async fn get_recent_failures(
        &self,
        user_id: &UserId,
        limit: Option<usize>,
    ) -> AuditResult<Vec<AuditEntry>> {
        let limit = limit.unwrap_or(self.settings.recent_failures_limit);
        let entries = self.sorted_entries(user_id).await?;
        Ok(entries
            .into_iter()
            .filter(|e| !e.success)
            .take(limit)
            .collect())
    }

    /// Number of successful attempts of `action_class` recorded at or after `since`.
    ///
    /// Backs the per-day and per-week limits of authorization conditions.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the ledger cannot be read.
    pub async fn count_successful_since(
        &self,
        user_id: &UserId,
        action_class: &ActionClass,
        since: Timestamp,
    ) -> AuditResult<u64> {
        let entries = self.storage.entries_for_user(user_id).await?;
        let count = entries
            .iter()
            .filter(|e| e.success && &e.action_class == action_class && e.timestamp >= since)
            .count();
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }

    async fn sorted_entries(&self, user_id: &UserId) -> AuditResult<Vec<AuditEntry>> {
        let mut entries = self.storage.entries_for_user(user_id).await?;
        // Ids are time-ordered, so they break timestamp ties by creation order.
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.id.cmp(&a.id)));
        Ok(entries)
    }
}

impl std::fmt::Debug for AuditService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditService")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
