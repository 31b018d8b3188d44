//! The rollback service: eligibility and execution of undo operations.

use chrono::Duration as ChronoDuration;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use warrant_audit::{AuditEntry, AuditService};
use warrant_core::{
    ActionClass, AuditEntryId, Clock, RollbackId, RollbackStrategy, Timestamp, UndoAction, UserId,
};

use crate::error::{RollbackError, RollbackResult};
use crate::registry::UndoRegistry;
use crate::rollback::{Rollback, RollbackEligibility, RollbackStatus, RollbackVerification};
use crate::store::RollbackStore;

/// Timing knobs for rollbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollbackSettings {
    /// How long after an action it may still be rolled back.
    pub window: ChronoDuration,
    /// Upper bound on one undo invocation.
    pub undo_timeout: Duration,
}

impl Default for RollbackSettings {
    fn default() -> Self {
        Self {
            window: ChronoDuration::hours(24),
            undo_timeout: Duration::from_secs(30),
        }
    }
}

/// Per-call overrides for [`RollbackService::execute_rollback_with`].
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Replaces the configured undo timeout.
    pub timeout: Option<Duration>,
    /// Cancels the undo invocation when triggered.
    pub cancel: Option<CancellationToken>,
}

/// Decides whether audited actions can be reversed and reverses them.
pub struct RollbackService {
    audit: Arc<AuditService>,
    store: Arc<dyn RollbackStore>,
    registry: UndoRegistry,
    clock: Arc<dyn Clock>,
    settings: RollbackSettings,
}

impl RollbackService {
    /// Create a rollback service.
    #[must_use]
    pub fn new(
        audit: Arc<AuditService>,
        store: Arc<dyn RollbackStore>,
        registry: UndoRegistry,
        clock: Arc<dyn Clock>,
        settings: RollbackSettings,
    ) -> Self {
        Self {
            audit,
            store,
            registry,
            clock,
            settings,
        }
    }

    /// Strategy for an action class, from the static table.
    #[must_use]
    pub fn get_rollback_strategy(&self, action_class: &ActionClass) -> RollbackStrategy {
        RollbackStrategy::for_action_class(action_class)
    }

    /// Whether the entry could be rolled back now. Read-only; never fails.
    pub async fn can_rollback(&self, audit_entry_id: &AuditEntryId) -> RollbackEligibility {
        match self.audit.get_audit_entry(audit_entry_id).await {
            Ok(Some(entry)) => self.eligibility(&entry),
            Ok(None) => RollbackEligibility::denied(
                RollbackStrategy::NotSupported,
                "Audit entry not found",
                None,
            ),
            Err(e) => {
                error!(audit_entry_id = %audit_entry_id, error = %e, "Rollback eligibility check failed");
                RollbackEligibility::denied(
                    RollbackStrategy::NotSupported,
                    format!("Eligibility check failed: {e}"),
                    None,
                )
            },
        }
    }

    fn eligibility(&self, entry: &AuditEntry) -> RollbackEligibility {
        let strategy = self.get_rollback_strategy(&entry.action_class);
        let expires_at = self.window_end(entry.timestamp);

        if !entry.success {
            return RollbackEligibility::denied(
                strategy,
                "Cannot rollback failed action",
                Some(expires_at),
            );
        }
        if !strategy.is_supported() {
            return RollbackEligibility::denied(
                strategy,
                format!("{} does not support rollback", entry.action_class),
                Some(expires_at),
            );
        }
        if expires_at < self.clock.now() {
            return RollbackEligibility::denied(strategy, "Rollback window expired", Some(expires_at));
        }

        RollbackEligibility {
            can_rollback: true,
            strategy,
            reason: None,
            expires_at: Some(expires_at),
        }
    }

    /// Roll back an entry owned by `user_id` with the configured timeout.
    ///
    /// # Errors
    ///
    /// See [`execute_rollback_with`](Self::execute_rollback_with).
    pub async fn execute_rollback(
        &self,
        audit_entry_id: &AuditEntryId,
        user_id: &UserId,
        reason: Option<String>,
    ) -> RollbackResult<Rollback> {
        self.execute_rollback_with(audit_entry_id, user_id, reason, ExecuteOptions::default())
            .await
    }

    /// Roll back an entry owned by `user_id`.
    ///
    /// Pre-flight failures reject the call and create no record. Once the
    /// record exists, any failure of the undo operation (error, timeout,
    /// cancellation) resolves to a `failed` record instead of an error.
    ///
    /// # Errors
    ///
    /// - [`RollbackError::AuditEntryNotFound`] if the entry does not exist
    /// - [`RollbackError::AccessDenied`] if `user_id` does not own it
    /// - [`RollbackError::NotEligible`] with the eligibility reason
    /// - [`RollbackError::NoUndoHandler`] if no handler is registered
    /// - [`RollbackError::AlreadyRolledBack`] / [`RollbackError::InProgress`]
    ///   if another rollback of the entry holds the claim
    /// - [`RollbackError::Interrupted`] if the undo task panicked
    /// - a storage error
    pub async fn execute_rollback_with(
        &self,
        audit_entry_id: &AuditEntryId,
        user_id: &UserId,
        reason: Option<String>,
        options: ExecuteOptions,
    ) -> RollbackResult<Rollback> {
        let entry = self
            .audit
            .get_audit_entry(audit_entry_id)
            .await?
            .ok_or_else(|| RollbackError::AuditEntryNotFound(audit_entry_id.clone()))?;

        if &entry.user_id != user_id {
            warn!(
                audit_entry_id = %audit_entry_id,
                user_id = %user_id,
                "Rollback refused: not the owner"
            );
            return Err(RollbackError::AccessDenied);
        }

        let eligibility = self.eligibility(&entry);
        if !eligibility.can_rollback {
            return Err(RollbackError::NotEligible {
                reason: eligibility.reason.unwrap_or_default(),
            });
        }
        let expires_at = eligibility.expires_at.unwrap_or(entry.timestamp);

        let handler = self
            .registry
            .get(&entry.action_class)
            .ok_or_else(|| RollbackError::NoUndoHandler(entry.action_class.clone()))?;

        let timeout = options.timeout.unwrap_or(self.settings.undo_timeout);
        let now = self.clock.now();
        let rollback = Rollback::start(
            &entry,
            eligibility.strategy,
            reason,
            expires_at,
            now,
            now.saturating_add(ChronoDuration::from_std(timeout).unwrap_or(ChronoDuration::MAX)),
        );

        self.acquire(audit_entry_id, &rollback.id).await?;

        if let Err(e) = self.store.save(&rollback).await {
            release_claim(self.store.as_ref(), audit_entry_id, &rollback.id).await;
            return Err(e);
        }
        info!(
            rollback_id = %rollback.id,
            audit_entry_id = %audit_entry_id,
            user_id = %user_id,
            action_class = %entry.action_class,
            strategy = %rollback.strategy,
            "Rollback started"
        );

        // Runs detached: dropping this call still lets the attempt reach a
        // terminal status and release its claim.
        let attempt = UndoAttempt {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
            handler,
            timeout,
            cancel: options.cancel.unwrap_or_default(),
        };
        let rollback_id = rollback.id.clone();
        tokio::spawn(attempt.run(rollback)).await.map_err(|e| {
            error!(rollback_id = %rollback_id, error = %e, "Rollback task ended abnormally");
            RollbackError::Interrupted(e.to_string())
        })?
    }

    /// Take the claim on `audit_entry_id` for `rollback_id`.
    ///
    /// A holder that failed, or that is still `in_progress` past its
    /// deadline, is taken over; an abandoned holder is marked failed.
    async fn acquire(
        &self,
        audit_entry_id: &AuditEntryId,
        rollback_id: &RollbackId,
    ) -> RollbackResult<()> {
        let Some(holder) = self.store.claim(audit_entry_id, rollback_id).await? else {
            return Ok(());
        };
        let Some(mut existing) = self.store.get(&holder).await? else {
            return Err(RollbackError::InProgress);
        };
        if existing.status == RollbackStatus::Completed {
            return Err(RollbackError::AlreadyRolledBack(existing.id));
        }
        let abandoned = existing.is_stale(self.clock.now());
        if existing.status != RollbackStatus::Failed && !abandoned {
            return Err(RollbackError::InProgress);
        }
        if !self.store.transfer(audit_entry_id, &holder, rollback_id).await? {
            return Err(RollbackError::InProgress);
        }

        if abandoned {
            warn!(
                rollback_id = %existing.id,
                audit_entry_id = %audit_entry_id,
                deadline = %existing.deadline,
                "Taking over abandoned rollback"
            );
            existing.fail("Rollback abandoned before completion");
            if let Err(e) = self.store.save(&existing).await {
                release_claim(self.store.as_ref(), audit_entry_id, rollback_id).await;
                return Err(e);
            }
        }
        Ok(())
    }

    /// Whether a rollback completed. Read-only; never fails.
    pub async fn verify_rollback(&self, rollback_id: &RollbackId) -> RollbackVerification {
        match self.store.get(rollback_id).await {
            Ok(Some(rollback)) => {
                let message = match rollback.status {
                    RollbackStatus::Completed => "Rollback completed successfully".to_string(),
                    RollbackStatus::Failed => format!(
                        "Rollback failed: {}",
                        rollback.error_message.as_deref().unwrap_or("unknown error")
                    ),
                    RollbackStatus::InProgress => "Rollback is still in progress".to_string(),
                    RollbackStatus::Pending => "Rollback has not started yet".to_string(),
                };
                RollbackVerification {
                    verified: rollback.status == RollbackStatus::Completed,
                    message,
                }
            },
            Ok(None) => RollbackVerification {
                verified: false,
                message: "Rollback not found".to_string(),
            },
            Err(e) => {
                error!(rollback_id = %rollback_id, error = %e, "Rollback verification failed");
                RollbackVerification {
                    verified: false,
                    message: format!("Verification failed: {e}"),
                }
            },
        }
    }

    /// A user's rollbacks, most recent first, optionally of one status.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the table cannot be read.
    pub async fn get_rollback_history(
        &self,
        user_id: &UserId,
        status: Option<RollbackStatus>,
    ) -> RollbackResult<Vec<Rollback>> {
        let mut all = self.store.list_for_user(user_id).await?;
        if let Some(status) = status {
            all.retain(|r| r.status == status);
        }
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        debug!(user_id = %user_id, count = all.len(), "Loaded rollback history");
        Ok(all)
    }

    /// Fetch one rollback.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the lookup fails.
    pub async fn get_rollback(&self, rollback_id: &RollbackId) -> RollbackResult<Option<Rollback>> {
        self.store.get(rollback_id).await
    }

    /// End of the rollback window for an action recorded at `timestamp`.
    #[must_use]
    pub fn window_end(&self, timestamp: Timestamp) -> Timestamp {
        timestamp.saturating_add(self.settings.window)
    }
}

impl std::fmt::Debug for RollbackService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RollbackService")
            .field("registry", &self.registry)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// One undo invocation and the terminal write that follows it.
struct UndoAttempt {
    store: Arc<dyn RollbackStore>,
    clock: Arc<dyn Clock>,
    handler: Arc<dyn UndoAction>,
    timeout: Duration,
    cancel: CancellationToken,
}

impl UndoAttempt {
    async fn run(self, mut rollback: Rollback) -> RollbackResult<Rollback> {
        let outcome = tokio::select! {
            biased;
            () = self.cancel.cancelled() => None,
            result = tokio::time::timeout(
                self.timeout,
                self.handler.undo(&rollback.action_class, &rollback.rollback_data),
            ) => Some(result),
        };

        match outcome {
            Some(Ok(Ok(()))) => {
                rollback.complete(self.clock.now());
                info!(rollback_id = %rollback.id, "Rollback completed");
            },
            Some(Ok(Err(e))) => {
                warn!(rollback_id = %rollback.id, error = %e, "Undo operation failed");
                rollback.fail(e.to_string());
            },
            Some(Err(_elapsed)) => {
                warn!(rollback_id = %rollback.id, timeout = ?self.timeout, "Undo operation timed out");
                rollback.fail(format!("Rollback timed out after {:?}", self.timeout));
            },
            None => {
                warn!(rollback_id = %rollback.id, "Undo operation cancelled");
                rollback.fail("Rollback cancelled");
            },
        }

        // On a failed write the claim stays held; the record goes stale at
        // its deadline and the next attempt takes over.
        self.store.save(&rollback).await?;
        if rollback.status == RollbackStatus::Failed {
            release_claim(self.store.as_ref(), &rollback.audit_entry_id, &rollback.id).await;
        }
        Ok(rollback)
    }
}

async fn release_claim(
    store: &dyn RollbackStore,
    audit_entry_id: &AuditEntryId,
    rollback_id: &RollbackId,
) {
    if let Err(e) = store.release(audit_entry_id, rollback_id).await {
        error!(audit_entry_id = %audit_entry_id, error = %e, "Failed to release rollback claim");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::KvRollbackStore;
    use serde_json::json;
    use warrant_audit::{ActionRecord, AuditSettings, KvAuditStorage};
    use warrant_core::AuthorizationId;
    use warrant_test::{FixedClock, RecordingUndo, UndoBehavior, memory_store};

    struct Fixture {
        clock: Arc<FixedClock>,
        audit: Arc<AuditService>,
        undo: RecordingUndo,
        rollbacks: Arc<RollbackService>,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(FixedClock::default());
        let dyn_clock: Arc<dyn Clock> = Arc::clone(&clock) as Arc<dyn Clock>;
        let kv = memory_store();
        let audit = Arc::new(AuditService::new(
            Arc::new(KvAuditStorage::new(Arc::clone(&kv))),
            Arc::clone(&dyn_clock),
            AuditSettings::default(),
        ));
        let undo = RecordingUndo::new();
        let mut registry = UndoRegistry::new();
        for class in [
            ActionClass::CreateTask,
            ActionClass::CreateCalendarEvent,
            ActionClass::UpdateTask,
        ] {
            registry.register(class, Arc::new(undo.clone()));
        }
        let rollbacks = Arc::new(RollbackService::new(
            Arc::clone(&audit),
            Arc::new(KvRollbackStore::new(kv)),
            registry,
            dyn_clock,
            RollbackSettings {
                undo_timeout: Duration::from_millis(200),
                ..RollbackSettings::default()
            },
        ));
        Fixture {
            clock,
            audit,
            undo,
            rollbacks,
        }
    }

    async fn log(f: &Fixture, user: &str, class: ActionClass, success: bool) -> AuditEntry {
        let record = ActionRecord::new(UserId::new(user), class, "act")
            .with_authorization(AuthorizationId::new())
            .with_input(json!({ "title": "Write report" }));
        let record = if success {
            record.succeeded(json!({ "taskId": "t-1", "eventId": "e-1" }))
        } else {
            record.failed("provider error")
        };
        f.audit.log_proxy_action(record).await.unwrap()
    }

    #[tokio::test]
    async fn test_strategy_table() {
        let f = fixture();
        assert_eq!(
            f.rollbacks.get_rollback_strategy(&ActionClass::CreateTask),
            RollbackStrategy::DirectUndo
        );
        assert_eq!(
            f.rollbacks.get_rollback_strategy(&ActionClass::DeleteCalendarEvent),
            RollbackStrategy::Compensating
        );
        assert_eq!(
            f.rollbacks.get_rollback_strategy(&ActionClass::PostSlackMessage),
            RollbackStrategy::NotSupported
        );
    }

    #[tokio::test]
    async fn test_can_rollback_scenarios() {
        let f = fixture();
        let task = log(&f, "u1", ActionClass::CreateTask, true).await;
        let ok = f.rollbacks.can_rollback(&task.id).await;
        assert!(ok.can_rollback);
        assert_eq!(ok.strategy, RollbackStrategy::DirectUndo);
        assert_eq!(
            ok.expires_at,
            Some(task.timestamp.saturating_add(ChronoDuration::hours(24)))
        );

        let email = log(&f, "u1", ActionClass::SendEmail, true).await;
        let no = f.rollbacks.can_rollback(&email.id).await;
        assert!(!no.can_rollback);
        assert_eq!(no.strategy, RollbackStrategy::NotSupported);
        assert_eq!(no.reason.as_deref(), Some("send_email does not support rollback"));

        let failed = log(&f, "u1", ActionClass::CreateTask, false).await;
        let no = f.rollbacks.can_rollback(&failed.id).await;
        assert_eq!(no.reason.as_deref(), Some("Cannot rollback failed action"));

        let missing = f.rollbacks.can_rollback(&AuditEntryId::new()).await;
        assert!(!missing.can_rollback);
        assert_eq!(missing.reason.as_deref(), Some("Audit entry not found"));
    }

    #[tokio::test]
    async fn test_window_boundary() {
        let f = fixture();
        let task = log(&f, "u1", ActionClass::CreateTask, true).await;

        f.clock.advance(ChronoDuration::hours(24));
        assert!(f.rollbacks.can_rollback(&task.id).await.can_rollback);

        f.clock.advance(ChronoDuration::seconds(1));
        let expired = f.rollbacks.can_rollback(&task.id).await;
        assert!(!expired.can_rollback);
        assert_eq!(expired.reason.as_deref(), Some("Rollback window expired"));

        let err = f
            .rollbacks
            .execute_rollback(&task.id, &UserId::new("u1"), None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Rollback window expired");
    }

    #[tokio::test]
    async fn test_execute_rollback_completes() {
        let f = fixture();
        let task = log(&f, "u1", ActionClass::CreateTask, true).await;

        let rollback = f
            .rollbacks
            .execute_rollback(&task.id, &UserId::new("u1"), Some("wrong list".to_string()))
            .await
            .unwrap();
        assert_eq!(rollback.status, RollbackStatus::Completed);
        assert_eq!(rollback.completed_at, Some(f.clock.now()));
        assert_eq!(rollback.rollback_data.resource_id.as_deref(), Some("t-1"));
        assert_eq!(f.undo.call_count(), 1);
        assert_eq!(f.undo.calls()[0].1.original_input, json!({ "title": "Write report" }));

        let verification = f.rollbacks.verify_rollback(&rollback.id).await;
        assert!(verification.verified);

        let err = f
            .rollbacks
            .execute_rollback(&task.id, &UserId::new("u1"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RollbackError::AlreadyRolledBack(id) if id == rollback.id));
        assert_eq!(f.undo.call_count(), 1);
    }

    #[tokio::test]
    async fn test_execute_rollback_access_denied() {
        let f = fixture();
        let task = log(&f, "u1", ActionClass::CreateTask, true).await;
        let err = f
            .rollbacks
            .execute_rollback(&task.id, &UserId::new("u2"), None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Access denied");
        assert_eq!(f.undo.call_count(), 0);
        assert!(
            f.rollbacks
                .get_rollback_history(&UserId::new("u1"), None)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_preflight_failures_create_no_row() {
        let f = fixture();
        let user = UserId::new("u1");

        let email = log(&f, "u1", ActionClass::SendEmail, true).await;
        assert!(matches!(
            f.rollbacks.execute_rollback(&email.id, &user, None).await,
            Err(RollbackError::NotEligible { .. })
        ));

        assert!(matches!(
            f.rollbacks.execute_rollback(&AuditEntryId::new(), &user, None).await,
            Err(RollbackError::AuditEntryNotFound(_))
        ));

        let issue = log(&f, "u1", ActionClass::CreateGithubIssue, true).await;
        assert!(matches!(
            f.rollbacks.execute_rollback(&issue.id, &user, None).await,
            Err(RollbackError::NoUndoHandler(ActionClass::CreateGithubIssue))
        ));

        assert!(
            f.rollbacks
                .get_rollback_history(&user, None)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_undo_failure_resolves_failed_and_allows_retry() {
        let f = fixture();
        let user = UserId::new("u1");
        let task = log(&f, "u1", ActionClass::CreateTask, true).await;

        f.undo.set_behavior(UndoBehavior::Fail("task service down".to_string()));
        let failed = f.rollbacks.execute_rollback(&task.id, &user, None).await.unwrap();
        assert_eq!(failed.status, RollbackStatus::Failed);
        assert_eq!(failed.error_message.as_deref(), Some("task service down"));
        assert!(failed.completed_at.is_none());

        let verification = f.rollbacks.verify_rollback(&failed.id).await;
        assert!(!verification.verified);
        assert!(verification.message.contains("task service down"));

        f.undo.set_behavior(UndoBehavior::Succeed);
        f.clock.advance(ChronoDuration::minutes(1));
        let retried = f.rollbacks.execute_rollback(&task.id, &user, None).await.unwrap();
        assert_eq!(retried.status, RollbackStatus::Completed);

        let history = f.rollbacks.get_rollback_history(&user, None).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, retried.id);

        let failed_only = f
            .rollbacks
            .get_rollback_history(&user, Some(RollbackStatus::Failed))
            .await
            .unwrap();
        assert_eq!(failed_only.len(), 1);
        assert_eq!(failed_only[0].id, failed.id);
    }

    #[tokio::test]
    async fn test_undo_timeout_marks_failed() {
        let f = fixture();
        let task = log(&f, "u1", ActionClass::CreateTask, true).await;
        f.undo.set_behavior(UndoBehavior::Hang);

        let rollback = f
            .rollbacks
            .execute_rollback_with(
                &task.id,
                &UserId::new("u1"),
                None,
                ExecuteOptions {
                    timeout: Some(Duration::from_millis(20)),
                    cancel: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(rollback.status, RollbackStatus::Failed);
        assert_eq!(rollback.error_message.as_deref(), Some("Rollback timed out after 20ms"));

        let stored = f.rollbacks.get_rollback(&rollback.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RollbackStatus::Failed);
    }

    async fn wait_for_history(f: &Fixture, user: &UserId, done: fn(&Rollback) -> bool) -> Rollback {
        for _ in 0..200 {
            let history = f.rollbacks.get_rollback_history(user, None).await.unwrap();
            if let Some(rollback) = history.into_iter().find(|r| done(r)) {
                return rollback;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("no matching rollback recorded");
    }

    #[tokio::test]
    async fn test_dropped_call_still_resolves_and_releases() {
        let f = fixture();
        let user = UserId::new("u1");
        let task = log(&f, "u1", ActionClass::CreateTask, true).await;
        f.undo.set_behavior(UndoBehavior::Hang);

        let rollbacks = Arc::clone(&f.rollbacks);
        let id = task.id.clone();
        let call = tokio::spawn(async move {
            rollbacks.execute_rollback(&id, &UserId::new("u1"), None).await
        });
        wait_for_history(&f, &user, |r| r.status == RollbackStatus::InProgress).await;
        call.abort();
        assert!(call.await.unwrap_err().is_cancelled());

        let first = wait_for_history(&f, &user, |r| r.status.is_terminal()).await;
        assert_eq!(first.status, RollbackStatus::Failed);
        assert_eq!(
            first.error_message.as_deref(),
            Some("Rollback timed out after 200ms")
        );

        f.undo.set_behavior(UndoBehavior::Succeed);
        let retried = f.rollbacks.execute_rollback(&task.id, &user, None).await.unwrap();
        assert_eq!(retried.status, RollbackStatus::Completed);
    }

    #[tokio::test]
    async fn test_abandoned_attempt_is_taken_over_after_deadline() {
        let f = fixture();
        let user = UserId::new("u1");
        let task = log(&f, "u1", ActionClass::CreateTask, true).await;
        f.undo.set_behavior(UndoBehavior::Hang);

        let rollbacks = Arc::clone(&f.rollbacks);
        let id = task.id.clone();
        let call = tokio::spawn(async move {
            rollbacks
                .execute_rollback_with(
                    &id,
                    &UserId::new("u1"),
                    None,
                    ExecuteOptions {
                        timeout: Some(Duration::from_secs(3600)),
                        cancel: None,
                    },
                )
                .await
        });
        let stuck = wait_for_history(&f, &user, |r| r.status == RollbackStatus::InProgress).await;
        call.abort();
        f.undo.set_behavior(UndoBehavior::Succeed);

        assert!(matches!(
            f.rollbacks.execute_rollback(&task.id, &user, None).await,
            Err(RollbackError::InProgress)
        ));

        f.clock.advance(ChronoDuration::hours(1));
        f.clock.advance(ChronoDuration::seconds(1));
        let retried = f.rollbacks.execute_rollback(&task.id, &user, None).await.unwrap();
        assert_eq!(retried.status, RollbackStatus::Completed);

        let abandoned = f.rollbacks.get_rollback(&stuck.id).await.unwrap().unwrap();
        assert_eq!(abandoned.status, RollbackStatus::Failed);
        assert_eq!(
            abandoned.error_message.as_deref(),
            Some("Rollback abandoned before completion")
        );
        assert!(matches!(
            f.rollbacks.execute_rollback(&task.id, &user, None).await,
            Err(RollbackError::AlreadyRolledBack(id)) if id == retried.id
        ));
    }

    #[tokio::test]
    async fn test_cancellation_marks_failed() {
        let f = fixture();
        let task = log(&f, "u1", ActionClass::CreateTask, true).await;
        f.undo.set_behavior(UndoBehavior::Hang);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let rollback = f
            .rollbacks
            .execute_rollback_with(
                &task.id,
                &UserId::new("u1"),
                None,
                ExecuteOptions {
                    timeout: None,
                    cancel: Some(cancel),
                },
            )
            .await
            .unwrap();
        assert_eq!(rollback.status, RollbackStatus::Failed);
        assert_eq!(rollback.error_message.as_deref(), Some("Rollback cancelled"));
    }

    #[tokio::test]
    async fn test_concurrent_rollbacks_invoke_undo_once() {
        let f = fixture();
        let task = log(&f, "u1", ActionClass::CreateTask, true).await;
        f.undo
            .set_behavior(UndoBehavior::Delay(Duration::from_millis(20)));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let rollbacks = Arc::clone(&f.rollbacks);
            let id = task.id.clone();
            handles.push(tokio::spawn(async move {
                rollbacks.execute_rollback(&id, &UserId::new("u1"), None).await
            }));
        }
        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }

        let completed = results
            .iter()
            .filter(|r| matches!(r, Ok(rb) if rb.status == RollbackStatus::Completed))
            .count();
        assert_eq!(completed, 1);
        assert!(results.iter().filter(|r| r.is_err()).all(|r| matches!(
            r,
            Err(RollbackError::InProgress | RollbackError::AlreadyRolledBack(_))
        )));
        assert_eq!(f.undo.call_count(), 1);
    }

    #[tokio::test]
    async fn test_verify_missing() {
        let f = fixture();
        let verification = f.rollbacks.verify_rollback(&RollbackId::new()).await;
        assert!(!verification.verified);
        assert_eq!(verification.message, "Rollback not found");
    }
}
