//! A [`KvStore`] view bound to one namespace, with JSON rows.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{StorageError, StorageResult};
use crate::kv::{KvStore, check_segment};

/// One logical table: a namespace of a shared [`KvStore`] whose rows are
/// JSON documents.
///
/// ```rust,ignore
/// let owners = ScopedKvStore::new(store, "authz:owners")?;
/// owners.set_json(&grant_id, &user_id).await?;
/// ```
#[derive(Clone)]
pub struct ScopedKvStore {
    inner: Arc<dyn KvStore>,
    namespace: String,
}

impl std::fmt::Debug for ScopedKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedKvStore")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

fn encode<T: Serialize + ?Sized>(value: &T) -> StorageResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| StorageError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> StorageResult<T> {
    serde_json::from_slice(bytes).map_err(|e| StorageError::Serialization(e.to_string()))
}

impl ScopedKvStore {
    /// Bind `store` to `namespace`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidKey`] for an empty namespace or one
    /// containing a null byte.
    pub fn new(store: Arc<dyn KvStore>, namespace: impl Into<String>) -> StorageResult<Self> {
        let namespace = namespace.into();
        check_segment("namespace", &namespace)?;
        Ok(Self {
            inner: store,
            namespace,
        })
    }

    /// The bound namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Read and decode one row.
    ///
    /// # Errors
    ///
    /// Returns a backend error, or [`StorageError::Serialization`] if the row
    /// is not a valid `T`.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        match self.inner.get(&self.namespace, key).await? {
            Some(bytes) => decode(&bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Encode and write one row.
    ///
    /// # Errors
    ///
    /// Returns a backend or serialization error.
    pub async fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StorageResult<()> {
        self.inner.set(&self.namespace, key, encode(value)?).await
    }

    /// Encode and write one row if `key` is free. See
    /// [`KvStore::insert_if_absent`].
    ///
    /// # Errors
    ///
    /// Returns a backend or serialization error.
    pub async fn insert_json_if_absent<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
    ) -> StorageResult<bool> {
        self.inner
            .insert_if_absent(&self.namespace, key, encode(value)?)
            .await
    }

    /// Replace the row at `key` with `new` (or remove it when `None`) only
    /// if it currently encodes to `expected`. See
    /// [`KvStore::compare_and_swap`].
    ///
    /// # Errors
    ///
    /// Returns a backend or serialization error.
    pub async fn compare_and_swap_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        expected: &T,
        new: Option<&T>,
    ) -> StorageResult<bool> {
        let new = new.map(encode).transpose()?;
        self.inner
            .compare_and_swap(&self.namespace, key, &encode(expected)?, new)
            .await
    }

    /// Remove one row. Returns whether it was present.
    ///
    /// # Errors
    ///
    /// Returns a backend error.
    pub async fn delete(&self, key: &str) -> StorageResult<bool> {
        self.inner.delete(&self.namespace, key).await
    }

    /// Decode every row of the table, in key order.
    ///
    /// # Errors
    ///
    /// Returns a backend error, or [`StorageError::Serialization`] for the
    /// first row that is not a valid `T`.
    pub async fn list_json<T: DeserializeOwned>(&self) -> StorageResult<Vec<T>> {
        let keys = self.inner.list_keys(&self.namespace).await?;
        let mut rows = Vec::with_capacity(keys.len());
        for key in keys {
            // A row deleted between listing and reading is skipped.
            if let Some(row) = self.get_json(&key).await? {
                rows.push(row);
            }
        }
        Ok(rows)
    }
}
