//! Persisted rollbacks (`rollbacks` table) and the per-entry claim.

use async_trait::async_trait;
use std::sync::Arc;
use warrant_core::{AuditEntryId, RollbackId, UserId};
use warrant_storage::{KvStore, MemoryKvStore, ScopedKvStore};

use crate::error::RollbackResult;
use crate::rollback::Rollback;

/// Storage backend for rollback records.
#[async_trait]
pub trait RollbackStore: Send + Sync {
    /// Insert or overwrite a record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be persisted.
    async fn save(&self, rollback: &Rollback) -> RollbackResult<()>;

    /// Get a record by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if retrieval or deserialization fails.
    async fn get(&self, id: &RollbackId) -> RollbackResult<Option<Rollback>>;

    /// Every record belonging to a user, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns an error if retrieval or deserialization fails.
    async fn list_for_user(&self, user_id: &UserId) -> RollbackResult<Vec<Rollback>>;

    /// Atomically reserve `audit_entry_id` for `rollback_id`.
    ///
    /// Returns `None` when the claim was taken, or the current holder when
    /// another rollback already holds it.
    ///
    /// # Errors
    ///
    /// Returns an error if the claim cannot be read or written.
    async fn claim(
        &self,
        audit_entry_id: &AuditEntryId,
        rollback_id: &RollbackId,
    ) -> RollbackResult<Option<RollbackId>>;

    /// Drop the claim on `audit_entry_id` so the entry can be retried.
    ///
    /// Only the holder can release: returns `false` and changes nothing when
    /// the claim belongs to another rollback or is already gone.
    ///
    /// # Errors
    ///
    /// Returns an error if the claim cannot be read or removed.
    async fn release(
        &self,
        audit_entry_id: &AuditEntryId,
        rollback_id: &RollbackId,
    ) -> RollbackResult<bool>;

    /// Hand the claim on `audit_entry_id` from `from` to `to`.
    ///
    /// Returns `false` when `from` no longer holds it.
    ///
    /// # Errors
    ///
    /// Returns an error if the claim cannot be read or written.
    async fn transfer(
        &self,
        audit_entry_id: &AuditEntryId,
        from: &RollbackId,
        to: &RollbackId,
    ) -> RollbackResult<bool>;
}

const NS_RECORDS_PREFIX: &str = "rollback:records";
const NS_OWNERS: &str = "rollback:owners";
const NS_CLAIMS: &str = "rollback:claims";

/// [`KvStore`]-backed rollback store.
pub struct KvRollbackStore {
    store: Arc<dyn KvStore>,
}

impl KvRollbackStore {
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

    fn scoped(&self, namespace: impl Into<String>) -> RollbackResult<ScopedKvStore> {
        Ok(ScopedKvStore::new(Arc::clone(&self.store), namespace)?)
    }

    fn records(&self, user_id: &UserId) -> RollbackResult<ScopedKvStore> {
        self.scoped(format!("{NS_RECORDS_PREFIX}:{user_id}"))
    }
}

#[async_trait]
impl RollbackStore for KvRollbackStore {
    async fn save(&self, rollback: &Rollback) -> RollbackResult<()> {
        let key = rollback.id.0.to_string();
        self.records(&rollback.user_id)?
            .set_json(&key, rollback)
            .await?;
        self.scoped(NS_OWNERS)?
            .set_json(&key, &rollback.user_id)
            .await?;
        Ok(())
    }

    async fn get(&self, id: &RollbackId) -> RollbackResult<Option<Rollback>> {
        let key = id.0.to_string();
        let Some(user_id) = self.scoped(NS_OWNERS)?.get_json::<UserId>(&key).await? else {
            return Ok(None);
        };
        Ok(self.records(&user_id)?.get_json(&key).await?)
    }

    async fn list_for_user(&self, user_id: &UserId) -> RollbackResult<Vec<Rollback>> {
        Ok(self.records(user_id)?.list_json().await?)
    }

    async fn claim(
        &self,
        audit_entry_id: &AuditEntryId,
        rollback_id: &RollbackId,
    ) -> RollbackResult<Option<RollbackId>> {
        let claims = self.scoped(NS_CLAIMS)?;
        let key = audit_entry_id.0.to_string();
        if claims.insert_json_if_absent(&key, rollback_id).await? {
            return Ok(None);
        }
        // Released between the failed insert and this read: report the
        // caller's own id so the conflict still surfaces.
        Ok(Some(
            claims
                .get_json::<RollbackId>(&key)
                .await?
                .unwrap_or_else(|| rollback_id.clone()),
        ))
    }

    async fn release(
        &self,
        audit_entry_id: &AuditEntryId,
        rollback_id: &RollbackId,
    ) -> RollbackResult<bool> {
        Ok(self
            .scoped(NS_CLAIMS)?
            .compare_and_swap_json(&audit_entry_id.0.to_string(), rollback_id, None)
            .await?)
    }

    async fn transfer(
        &self,
        audit_entry_id: &AuditEntryId,
        from: &RollbackId,
        to: &RollbackId,
    ) -> RollbackResult<bool> {
        Ok(self
            .scoped(NS_CLAIMS)?
            .compare_and_swap_json(&audit_entry_id.0.to_string(), from, Some(to))
            .await?)
    }
}

impl std::fmt::Debug for KvRollbackStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvRollbackStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_claim_is_exclusive_until_released() {
        let store = KvRollbackStore::in_memory();
        let entry = AuditEntryId::new();
        let first = RollbackId::new();
        let second = RollbackId::new();

        assert_eq!(store.claim(&entry, &first).await.unwrap(), None);
        assert_eq!(store.claim(&entry, &second).await.unwrap(), Some(first.clone()));

        assert!(!store.release(&entry, &second).await.unwrap());
        assert_eq!(store.claim(&entry, &second).await.unwrap(), Some(first.clone()));

        assert!(store.release(&entry, &first).await.unwrap());
        assert_eq!(store.claim(&entry, &second).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_transfer_requires_current_holder() {
        let store = KvRollbackStore::in_memory();
        let entry = AuditEntryId::new();
        let stale = RollbackId::new();
        let fresh = RollbackId::new();
        let other = RollbackId::new();

        assert_eq!(store.claim(&entry, &stale).await.unwrap(), None);
        assert!(!store.transfer(&entry, &other, &fresh).await.unwrap());
        assert!(store.transfer(&entry, &stale, &fresh).await.unwrap());

        // The previous holder can no longer release what it lost.
        assert!(!store.release(&entry, &stale).await.unwrap());
        assert_eq!(store.claim(&entry, &other).await.unwrap(), Some(fresh));
    }

    #[tokio::test]
    async fn test_concurrent_claims_single_winner() {
        let store = Arc::new(KvRollbackStore::in_memory());
        let entry = AuditEntryId::new();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            let entry = entry.clone();
            handles.push(tokio::spawn(async move {
                store.claim(&entry, &RollbackId::new()).await.unwrap().is_none()
            }));
        }
        let mut outcomes = Vec::new();
        for handle in handles {
            outcomes.push(handle.await.unwrap());
        }
        assert_eq!(outcomes.iter().filter(|won| **won).count(), 1);
    }
}
