//! The raw [`KvStore`] seam and its backends.
//!
//! A store holds opaque byte rows addressed by `(namespace, key)`. Ledger
//! crates pick one namespace per table, or per table and user when the table
//! is read user by user (`audit:entries:{user_id}`), plus flat owner indexes
//! keyed by record id (`audit:owners`).
//!
//! Backends:
//!
//! - [`MemoryKvStore`], always available
//! - `SurrealKvStore`, behind the `kv` feature

mod memory;
#[cfg(feature = "kv")]
mod surreal;

use async_trait::async_trait;

use crate::error::{StorageError, StorageResult};

pub use memory::MemoryKvStore;
#[cfg(feature = "kv")]
pub use surreal::SurrealKvStore;

/// Byte that separates a namespace from a key in encoded row keys.
pub(crate) const SEPARATOR: u8 = 0;

/// Byte-level storage of namespaced rows.
///
/// Every mutation is atomic with respect to other calls on the same store.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read one row. `None` if absent.
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Write one row, replacing any previous value.
    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()>;

    /// Write one row only if the key is free.
    ///
    /// Returns `true` for the one caller whose write landed. Rollback claims
    /// and expiry markers rely on this being linearizable.
    async fn insert_if_absent(
        &self,
        namespace: &str,
        key: &str,
        value: Vec<u8>,
    ) -> StorageResult<bool>;

    /// Replace one row only if it currently holds exactly `expected`.
    ///
    /// `None` as `new` removes the row. Returns whether the swap happened.
    /// Like [`insert_if_absent`](Self::insert_if_absent), this is atomic with
    /// respect to every other call.
    async fn compare_and_swap(
        &self,
        namespace: &str,
        key: &str,
        expected: &[u8],
        new: Option<Vec<u8>>,
    ) -> StorageResult<bool>;

    /// Remove one row. Returns whether it was present.
    async fn delete(&self, namespace: &str, key: &str) -> StorageResult<bool>;

    /// Keys present in `namespace`, in ascending byte order.
    async fn list_keys(&self, namespace: &str) -> StorageResult<Vec<String>>;
}

/// Reject an empty namespace or key, or one containing [`SEPARATOR`].
pub(crate) fn check_segment(kind: &str, value: &str) -> StorageResult<()> {
    if value.is_empty() {
        return Err(StorageError::InvalidKey(format!("{kind} must not be empty")));
    }
    if value.as_bytes().contains(&SEPARATOR) {
        return Err(StorageError::InvalidKey(format!(
            "{kind} must not contain a null byte"
        )));
    }
    Ok(())
}

/// Validate a `(namespace, key)` pair.
pub(crate) fn check_address(namespace: &str, key: &str) -> StorageResult<()> {
    check_segment("namespace", namespace)?;
    check_segment("key", key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_must_be_non_empty_and_separator_free() {
        assert!(check_segment("namespace", "").is_err());
        assert!(check_segment("namespace", "rollbacks\0claims").is_err());
        assert!(check_segment("namespace", "rollbacks:claims").is_ok());
        assert!(check_address("audit:owners", "").is_err());
        assert!(check_address("audit:owners", "3f1c").is_ok());
    }

    #[test]
    fn invalid_key_message_names_the_segment() {
        let err = check_segment("key", "").unwrap_err();
        assert_eq!(err.to_string(), "invalid key: key must not be empty");
    }
}
