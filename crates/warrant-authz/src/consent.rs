//! Consent ledger (`consent_history` table).
//!
//! An append-only record of every grant, revocation and expiry, used by
//! the consent dashboard.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};
use warrant_core::{ActionType, AuthorizationId, Clock, ConsentEntryId, Timestamp, UserId};
use warrant_storage::{KvStore, MemoryKvStore, ScopedKvStore};

use crate::authorization::{Authorization, GrantMethod};
use crate::error::AuthzResult;
use crate::store::AuthorizationStore;

/// Number of history entries shown on the dashboard.
pub const DASHBOARD_HISTORY_LIMIT: usize = 20;

/// `changed_by` value for changes the system makes on its own.
pub const SYSTEM_ACTOR: &str = "system";

/// Kind of change recorded in the consent ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// Authorization granted.
    Granted,
    /// Authorization modified.
    Modified,
    /// Authorization revoked.
    Revoked,
    /// Authorization passed its expiry.
    Expired,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Granted => write!(f, "granted"),
            Self::Modified => write!(f, "modified"),
            Self::Revoked => write!(f, "revoked"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

/// One consent ledger row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsentHistoryEntry {
    /// Unique identifier.
    pub id: ConsentEntryId,
    /// Owner of the authorization.
    pub user_id: UserId,
    /// Authorization the change applies to.
    pub authorization_id: AuthorizationId,
    /// Kind of change.
    pub change_type: ChangeType,
    /// State before the change (`null` for a grant).
    pub previous_state: serde_json::Value,
    /// State after the change.
    pub new_state: serde_json::Value,
    /// Who made the change: a user id or [`SYSTEM_ACTOR`].
    pub changed_by: String,
    /// Free-text reason.
    pub reason: Option<String>,
    /// When the change was recorded.
    pub timestamp: Timestamp,
}

/// Read model for a consent dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsentDashboard {
    /// Owner.
    pub user_id: UserId,
    /// Currently active authorizations, oldest grant first.
    pub active: Vec<Authorization>,
    /// Revoked or expired authorizations, oldest grant first.
    pub inactive: Vec<Authorization>,
    /// Number of active authorizations per action type.
    pub active_by_type: BTreeMap<ActionType, u64>,
    /// Most recent ledger entries, newest first.
    pub recent_history: Vec<ConsentHistoryEntry>,
}

/// Storage backend for the consent ledger.
#[async_trait]
pub trait ConsentStorage: Send + Sync {
    /// Durably store a new entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be persisted.
    async fn append(&self, entry: &ConsentHistoryEntry) -> AuthzResult<()>;

    /// Every entry recorded for a user, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns an error if retrieval or deserialization fails.
    async fn entries_for_user(&self, user_id: &UserId) -> AuthzResult<Vec<ConsentHistoryEntry>>;

    /// Atomically claim the right to record the expiry of an authorization.
    ///
    /// Returns `true` for exactly one caller per authorization.
    ///
    /// # Errors
    ///
    /// Returns an error if the claim cannot be persisted.
    async fn claim_expiration(&self, authorization_id: &AuthorizationId) -> AuthzResult<bool>;
}

const NS_HISTORY_PREFIX: &str = "consent:history";
const NS_EXPIRED: &str = "consent:expired";

/// [`KvStore`]-backed consent storage.
pub struct KvConsentStorage {
    store: Arc<dyn KvStore>,
}

impl KvConsentStorage {
    /// Create storage over a shared key-value store.
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Create an in-memory storage (for testing).
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryKvStore::new()))
    }

    fn history(&self, user_id: &UserId) -> AuthzResult<ScopedKvStore> {
        Ok(ScopedKvStore::new(
            Arc::clone(&self.store),
            format!("{NS_HISTORY_PREFIX}:{user_id}"),
        )?)
    }
}

#[async_trait]
impl ConsentStorage for KvConsentStorage {
    async fn append(&self, entry: &ConsentHistoryEntry) -> AuthzResult<()> {
        self.history(&entry.user_id)?
            .set_json(&entry.id.0.to_string(), entry)
            .await?;
        Ok(())
    }

    async fn entries_for_user(&self, user_id: &UserId) -> AuthzResult<Vec<ConsentHistoryEntry>> {
        Ok(self.history(user_id)?.list_json().await?)
    }

    async fn claim_expiration(&self, authorization_id: &AuthorizationId) -> AuthzResult<bool> {
        let claims = ScopedKvStore::new(Arc::clone(&self.store), NS_EXPIRED)?;
        Ok(claims
            .insert_json_if_absent(&authorization_id.0.to_string(), &true)
            .await?)
    }
}

impl fmt::Debug for KvConsentStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KvConsentStorage").finish_non_exhaustive()
    }
}

/// Records consent changes and serves the dashboard.
pub struct ConsentService {
    storage: Arc<dyn ConsentStorage>,
    authorizations: Arc<dyn AuthorizationStore>,
    clock: Arc<dyn Clock>,
}

impl ConsentService {
    /// Create a consent service.
    #[must_use]
    pub fn new(
        storage: Arc<dyn ConsentStorage>,
        authorizations: Arc<dyn AuthorizationStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            storage,
            authorizations,
            clock,
        }
    }

    /// Append a `granted` entry.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the entry cannot be persisted.
    pub async fn record_consent_grant(
        &self,
        authorization_id: &AuthorizationId,
        user_id: &UserId,
        grant_method: GrantMethod,
    ) -> AuthzResult<()> {
        self.append(
            authorization_id,
            user_id,
            ChangeType::Granted,
            serde_json::Value::Null,
            json!({ "status": "active", "grant_method": grant_method }),
            user_id.to_string(),
            None,
        )
        .await
    }

    /// Append a `revoked` entry.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the entry cannot be persisted.
    pub async fn record_consent_revocation(
        &self,
        authorization_id: &AuthorizationId,
        user_id: &UserId,
        reason: Option<String>,
    ) -> AuthzResult<()> {
        self.append(
            authorization_id,
            user_id,
            ChangeType::Revoked,
            json!({ "status": "active" }),
            json!({ "status": "revoked" }),
            user_id.to_string(),
            reason,
        )
        .await
    }

    /// Append an `expired` entry, once per authorization.
    ///
    /// Returns whether this call recorded the expiry.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the claim or entry cannot be persisted.
    pub async fn record_consent_expiration(
        &self,
        authorization_id: &AuthorizationId,
        user_id: &UserId,
    ) -> AuthzResult<bool> {
        if !self.storage.claim_expiration(authorization_id).await? {
            return Ok(false);
        }
        self.append(
            authorization_id,
            user_id,
            ChangeType::Expired,
            json!({ "status": "active" }),
            json!({ "status": "expired" }),
            SYSTEM_ACTOR.to_string(),
            Some("Authorization reached its expiry time".to_string()),
        )
        .await?;
        Ok(true)
    }

    /// A user's consent history, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the ledger cannot be read.
    pub async fn get_consent_history(
        &self,
        user_id: &UserId,
        authorization_id: Option<&AuthorizationId>,
        limit: Option<usize>,
    ) -> AuthzResult<Vec<ConsentHistoryEntry>> {
        let mut entries = self.storage.entries_for_user(user_id).await?;
        if let Some(id) = authorization_id {
            entries.retain(|e| &e.authorization_id == id);
        }
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.id.cmp(&a.id)));
        if let Some(limit) = limit {
            entries.truncate(limit);
        }
        Ok(entries)
    }

    /// Snapshot of a user's authorizations and recent consent changes.
    ///
    /// # Errors
    ///
    /// Returns a storage error if either table cannot be read.
    pub async fn get_consent_dashboard(&self, user_id: &UserId) -> AuthzResult<ConsentDashboard> {
        let now = self.clock.now();
        let (active, inactive): (Vec<_>, Vec<_>) = self
            .authorizations
            .list_for_user(user_id)
            .await?
            .into_iter()
            .partition(|a| a.is_active(now));

        let mut active_by_type = BTreeMap::new();
        for authorization in &active {
            let count: &mut u64 = active_by_type.entry(authorization.action_type).or_default();
            *count = count.saturating_add(1);
        }

        let recent_history = self
            .get_consent_history(user_id, None, Some(DASHBOARD_HISTORY_LIMIT))
            .await?;

        debug!(
            user_id = %user_id,
            active = active.len(),
            inactive = inactive.len(),
            "Built consent dashboard"
        );

        Ok(ConsentDashboard {
            user_id: user_id.clone(),
            active,
            inactive,
            active_by_type,
            recent_history,
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn append(
        &self,
        authorization_id: &AuthorizationId,
        user_id: &UserId,
        change_type: ChangeType,
        previous_state: serde_json::Value,
        new_state: serde_json::Value,
        changed_by: String,
        reason: Option<String>,
    ) -> AuthzResult<()> {
        let entry = ConsentHistoryEntry {
            id: ConsentEntryId::new(),
            user_id: user_id.clone(),
            authorization_id: authorization_id.clone(),
            change_type,
            previous_state,
            new_state,
            changed_by,
            reason,
            timestamp: self.clock.now(),
        };
        self.storage.append(&entry).await?;
        info!(
            user_id = %user_id,
            authorization_id = %authorization_id,
            change = %change_type,
            "Consent change recorded"
        );
        Ok(())
    }
}

impl fmt::Debug for ConsentService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsentService").finish_non_exhaustive()
    }
}
