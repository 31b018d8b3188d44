//! Persisted grants (`authorizations` table).

use async_trait::async_trait;
use std::sync::Arc;
use warrant_core::{ActionClass, AuthorizationId, UserId};
use warrant_storage::{KvStore, MemoryKvStore, ScopedKvStore};

use crate::authorization::Authorization;
use crate::error::AuthzResult;

/// Storage backend for authorization records.
///
/// Records are never hard-deleted; revocation rewrites the record with
/// `revoked_at` set.
#[async_trait]
pub trait AuthorizationStore: Send + Sync {
    /// Insert or overwrite a record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be persisted.
    async fn save(&self, authorization: &Authorization) -> AuthzResult<()>;

    /// Get a record by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if retrieval or deserialization fails.
    async fn get(&self, id: &AuthorizationId) -> AuthzResult<Option<Authorization>>;

    /// Every record belonging to a user, oldest grant first.
    ///
    /// # Errors
    ///
    /// Returns an error if retrieval or deserialization fails.
    async fn list_for_user(&self, user_id: &UserId) -> AuthzResult<Vec<Authorization>>;

    /// A user's records for one action class, oldest grant first.
    ///
    /// # Errors
    ///
    /// Returns an error if retrieval or deserialization fails.
    async fn list_for_action(
        &self,
        user_id: &UserId,
        action_class: &ActionClass,
    ) -> AuthzResult<Vec<Authorization>> {
        let mut all = self.list_for_user(user_id).await?;
        all.retain(|a| &a.action_class == action_class);
        Ok(all)
    }
}

const NS_GRANTS_PREFIX: &str = "authz:grants";
const NS_OWNERS: &str = "authz:owners";

/// [`KvStore`]-backed authorization store.
///
/// Grants live in a per-user namespace; a flat owner index resolves an id
/// to its user.
pub struct KvAuthorizationStore {
    store: Arc<dyn KvStore>,
}

impl KvAuthorizationStore {
    /// Create a store over a shared key-value store.
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Create an in-memory store (for testing).
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryKvStore::new()))
    }

    fn owners(&self) -> AuthzResult<ScopedKvStore> {
        Ok(ScopedKvStore::new(Arc::clone(&self.store), NS_OWNERS)?)
    }

    fn grants(&self, user_id: &UserId) -> AuthzResult<ScopedKvStore> {
        Ok(ScopedKvStore::new(
            Arc::clone(&self.store),
            format!("{NS_GRANTS_PREFIX}:{user_id}"),
        )?)
    }
}

#[async_trait]
impl AuthorizationStore for KvAuthorizationStore {
    async fn save(&self, authorization: &Authorization) -> AuthzResult<()> {
        let key = authorization.id.0.to_string();
        self.grants(&authorization.user_id)?
            .set_json(&key, authorization)
            .await?;
        self.owners()?
            .set_json(&key, &authorization.user_id)
            .await?;
        Ok(())
    }

    async fn get(&self, id: &AuthorizationId) -> AuthzResult<Option<Authorization>> {
        let key = id.0.to_string();
        let Some(user_id) = self.owners()?.get_json::<UserId>(&key).await? else {
            return Ok(None);
        };
        Ok(self.grants(&user_id)?.get_json(&key).await?)
    }

    async fn list_for_user(&self, user_id: &UserId) -> AuthzResult<Vec<Authorization>> {
        let mut all: Vec<Authorization> = self.grants(user_id)?.list_json().await?;
        all.sort_by(|a, b| a.granted_at.cmp(&b.granted_at).then_with(|| a.id.cmp(&b.id)));
        Ok(all)
    }
}

impl std::fmt::Debug for KvAuthorizationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvAuthorizationStore").finish_non_exhaustive()
    }
}
