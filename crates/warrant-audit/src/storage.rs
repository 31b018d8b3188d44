//! Audit log storage trait and key-value implementation.

use async_trait::async_trait;
use std::sync::Arc;
use warrant_core::{AuditEntryId, UserId};
use warrant_storage::{KvStore, MemoryKvStore, ScopedKvStore};

use crate::entry::AuditEntry;
use crate::error::AuditResult;

/// Storage backend for the audit ledger (`audit_log` table).
///
/// The ledger is insert-only: implementations expose no update or delete.
#[async_trait]
pub trait AuditStorage: Send + Sync {
    /// Durably store a new entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be persisted.
    async fn append(&self, entry: &AuditEntry) -> AuditResult<()>;

    /// Get an entry by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if retrieval or deserialization fails.
    async fn get(&self, id: &AuditEntryId) -> AuditResult<Option<AuditEntry>>;

    /// Get every entry recorded for a user, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns an error if retrieval or deserialization fails.
    async fn entries_for_user(&self, user_id: &UserId) -> AuditResult<Vec<AuditEntry>>;
}

// -- Namespace constants --

const NS_ENTRIES_PREFIX: &str = "audit:entries";
const NS_OWNERS: &str = "audit:owners";

/// [`KvStore`]-backed audit storage.
///
/// Entries live in a per-user namespace so a user's ledger is listed without
/// touching anyone else's; a flat owner index resolves an entry id to its user.
pub struct KvAuditStorage {
    store: Arc<dyn KvStore>,
}

impl KvAuditStorage {
    /// Create audit storage over a shared key-value store.
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Create an in-memory storage (for testing).
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryKvStore::new()))
    }

    fn owners(&self) -> AuditResult<ScopedKvStore> {
        Ok(ScopedKvStore::new(Arc::clone(&self.store), NS_OWNERS)?)
    }

    fn user_entries(&self, user_id: &UserId) -> AuditResult<ScopedKvStore> {
        Ok(ScopedKvStore::new(
            Arc::clone(&self.store),
            format!("{NS_ENTRIES_PREFIX}:{user_id}"),
        )?)
    }
}

#[async_trait]
impl AuditStorage for KvAuditStorage {
    async fn append(&self, entry: &AuditEntry) -> AuditResult<()> {
        let key = entry.id.0.to_string();

        // Entry first, owner index second: an index row never points at a
        // missing entry.
        self.user_entries(&entry.user_id)?
            .set_json(&key, entry)
            .await?;
        self.owners()?.set_json(&key, &entry.user_id).await?;
        Ok(())
    }

    async fn get(&self, id: &AuditEntryId) -> AuditResult<Option<AuditEntry>> {
        let key = id.0.to_string();
        let Some(user_id) = self.owners()?.get_json::<UserId>(&key).await? else {
            return Ok(None);
        };
        Ok(self.user_entries(&user_id)?.get_json(&key).await?)
    }

    async fn entries_for_user(&self, user_id: &UserId) -> AuditResult<Vec<AuditEntry>> {
        Ok(self.user_entries(user_id)?.list_json().await?)
    }
}

impl std::fmt::Debug for KvAuditStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvAuditStorage").finish_non_exhaustive()
    }
}
