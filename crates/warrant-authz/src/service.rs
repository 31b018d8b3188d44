//! The authorization service: grant, check and revoke.

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info};
use warrant_core::{ActionClass, AuthorizationId, Clock, Metadata, UserId};

use crate::authorization::{Authorization, GrantRequest};
use crate::conditions::{ActionCounter, HoursWindowMode, PolicyEvaluator, Verdict};
use crate::consent::ConsentService;
use crate::error::{AuthzError, AuthzResult};
use crate::store::AuthorizationStore;

/// Denial reason when the user holds no active grant for the class.
pub const NO_AUTHORIZATION_REASON: &str = "No authorization found for this action";

/// Policy knobs for condition evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthzSettings {
    /// Interpretation of allowed-hours windows that cross midnight.
    pub hours_window: HoursWindowMode,
    /// First day of the week for weekly limits.
    pub week_starts_on: Weekday,
}

impl Default for AuthzSettings {
    fn default() -> Self {
        Self {
            hours_window: HoursWindowMode::NonWrapping,
            week_starts_on: Weekday::Sun,
        }
    }
}

/// Result of [`AuthorizationService::check_authorization`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationDecision {
    /// Whether the action may proceed.
    pub authorized: bool,
    /// Why it may not.
    pub reason: Option<String>,
    /// Grant that admitted the action.
    pub authorization_id: Option<AuthorizationId>,
}

impl AuthorizationDecision {
    /// An allow decision backed by `authorization_id`.
    #[must_use]
    pub fn allow(authorization_id: AuthorizationId) -> Self {
        Self {
            authorized: true,
            reason: None,
            authorization_id: Some(authorization_id),
        }
    }

    /// A denial with a reason.
    #[must_use]
    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            authorized: false,
            reason: Some(reason.into()),
            authorization_id: None,
        }
    }
}

/// Grants, checks and revokes authorizations.
///
/// The default posture is deny: anything short of a fully satisfied grant,
/// including an internal failure, yields `authorized: false` with a reason.
pub struct AuthorizationService {
    store: Arc<dyn AuthorizationStore>,
    consent: Arc<ConsentService>,
    evaluator: PolicyEvaluator,
    clock: Arc<dyn Clock>,
}

impl AuthorizationService {
    /// Create an authorization service.
    #[must_use]
    pub fn new(
        store: Arc<dyn AuthorizationStore>,
        consent: Arc<ConsentService>,
        counter: Arc<dyn ActionCounter>,
        clock: Arc<dyn Clock>,
        settings: AuthzSettings,
    ) -> Self {
        let evaluator = PolicyEvaluator {
            counter,
            clock: Arc::clone(&clock),
            hours_mode: settings.hours_window,
            week_start: settings.week_starts_on,
        };
        Self {
            store,
            consent,
            evaluator,
            clock,
        }
    }

    /// Persist a new grant and record it in the consent ledger.
    ///
    /// Duplicate grants are allowed; they are ORed at check time.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the grant or its consent entry cannot be
    /// persisted. A grant whose consent entry fails is left revoked.
    pub async fn grant_authorization(&self, request: GrantRequest) -> AuthzResult<Authorization> {
        let mut authorization = request.into_authorization(self.clock.now());
        self.store.save(&authorization).await?;
        if let Err(e) = self
            .consent
            .record_consent_grant(
                &authorization.id,
                &authorization.user_id,
                authorization.grant_method,
            )
            .await
        {
            error!(
                authorization_id = %authorization.id,
                error = %e,
                "Consent entry not recorded, withdrawing grant"
            );
            authorization.revoked_at = Some(self.clock.now());
            if let Err(withdraw) = self.store.save(&authorization).await {
                error!(
                    authorization_id = %authorization.id,
                    error = %withdraw,
                    "Failed to withdraw unrecorded grant"
                );
            }
            return Err(e);
        }

        info!(
            authorization_id = %authorization.id,
            user_id = %authorization.user_id,
            action_class = %authorization.action_class,
            scope = %authorization.scope,
            "Authorization granted"
        );
        Ok(authorization)
    }

    /// Decide whether `user_id` may perform `action_class` now.
    ///
    /// Never fails: storage or evaluation errors become a denial.
    pub async fn check_authorization(
        &self,
        user_id: &UserId,
        action_class: &ActionClass,
        confidence: Option<f64>,
        metadata: &Metadata,
    ) -> AuthorizationDecision {
        match self
            .decide(user_id, action_class, confidence, metadata)
            .await
        {
            Ok(decision) => {
                if decision.authorized {
                    debug!(
                        user_id = %user_id,
                        action_class = %action_class,
                        authorization_id = ?decision.authorization_id,
                        "Action authorized"
                    );
                } else {
                    info!(
                        user_id = %user_id,
                        action_class = %action_class,
                        reason = decision.reason.as_deref().unwrap_or_default(),
                        "Action denied"
                    );
                }
                decision
            },
            Err(e) => {
                error!(
                    user_id = %user_id,
                    action_class = %action_class,
                    error = %e,
                    "Authorization check failed"
                );
                AuthorizationDecision::deny(format!("Authorization check failed: {e}"))
            },
        }
    }

    async fn decide(
        &self,
        user_id: &UserId,
        action_class: &ActionClass,
        confidence: Option<f64>,
        metadata: &Metadata,
    ) -> AuthzResult<AuthorizationDecision> {
        let now = self.clock.now();
        let candidates: Vec<Authorization> = self
            .store
            .list_for_action(user_id, action_class)
            .await?
            .into_iter()
            .filter(|a| &a.user_id == user_id && a.is_active(now))
            .collect();

        if candidates.is_empty() {
            return Ok(AuthorizationDecision::deny(NO_AUTHORIZATION_REASON));
        }

        if let Some(c) = confidence
            && !(0.0..=1.0).contains(&c)
        {
            return Ok(AuthorizationDecision::deny(format!(
                "Invalid confidence score: {c}"
            )));
        }

        let mut reasons: Vec<String> = Vec::new();
        for authorization in &candidates {
            match self
                .evaluator
                .evaluate(authorization, confidence, metadata)
                .await?
            {
                Verdict::Pass => return Ok(AuthorizationDecision::allow(authorization.id.clone())),
                Verdict::Deny(reason) => {
                    if !reasons.contains(&reason) {
                        reasons.push(reason);
                    }
                },
            }
        }

        Ok(AuthorizationDecision::deny(reasons.join("; ")))
    }

    /// Revoke a grant owned by `user_id`.
    ///
    /// Revoking an already revoked grant returns it unchanged and records
    /// nothing.
    ///
    /// # Errors
    ///
    /// Returns [`AuthzError::NotFound`] if the grant does not exist,
    /// [`AuthzError::AccessDenied`] if it belongs to someone else, or a
    /// storage error.
    pub async fn revoke_authorization(
        &self,
        authorization_id: &AuthorizationId,
        user_id: &UserId,
        reason: Option<String>,
    ) -> AuthzResult<Authorization> {
        let mut authorization = self
            .store
            .get(authorization_id)
            .await?
            .ok_or_else(|| AuthzError::NotFound(authorization_id.clone()))?;

        if &authorization.user_id != user_id {
            info!(
                authorization_id = %authorization_id,
                user_id = %user_id,
                "Revocation refused: not the owner"
            );
            return Err(AuthzError::AccessDenied);
        }

        if authorization.is_revoked() {
            debug!(authorization_id = %authorization_id, "Authorization already revoked");
            return Ok(authorization);
        }

        authorization.revoked_at = Some(self.clock.now());
        self.store.save(&authorization).await?;
        self.consent
            .record_consent_revocation(authorization_id, user_id, reason)
            .await?;

        info!(
            authorization_id = %authorization_id,
            user_id = %user_id,
            action_class = %authorization.action_class,
            "Authorization revoked"
        );
        Ok(authorization)
    }

    /// Fetch one grant.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the lookup fails.
    pub async fn get_authorization(
        &self,
        authorization_id: &AuthorizationId,
    ) -> AuthzResult<Option<Authorization>> {
        self.store.get(authorization_id).await
    }

    /// A user's grants, oldest first, optionally only the active ones.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the table cannot be read.
    pub async fn list_authorizations(
        &self,
        user_id: &UserId,
        active_only: bool,
    ) -> AuthzResult<Vec<Authorization>> {
        let mut all = self.store.list_for_user(user_id).await?;
        if active_only {
            let now = self.clock.now();
            all.retain(|a| a.is_active(now));
        }
        Ok(all)
    }

    /// Record an `expired` consent entry for each unrevoked grant of
    /// `user_id` whose expiry has passed. Returns the grants newly recorded.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the tables cannot be read or written.
    pub async fn record_expirations(&self, user_id: &UserId) -> AuthzResult<Vec<AuthorizationId>> {
        let now = self.clock.now();
        let mut recorded = Vec::new();
        for authorization in self.store.list_for_user(user_id).await? {
            if authorization.is_revoked() || !authorization.is_expired(now) {
                continue;
            }
            if self
                .consent
                .record_consent_expiration(&authorization.id, user_id)
                .await?
            {
                recorded.push(authorization.id);
            }
        }
        if !recorded.is_empty() {
            info!(user_id = %user_id, count = recorded.len(), "Recorded authorization expirations");
        }
        Ok(recorded)
    }
}

impl std::fmt::Debug for AuthorizationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationService")
            .field("hours_mode", &self.evaluator.hours_mode)
            .field("week_start", &self.evaluator.week_start)
            .finish_non_exhaustive()
    }
}
