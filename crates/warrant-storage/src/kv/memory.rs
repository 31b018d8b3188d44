use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use super::{KvStore, check_address, check_segment};
use crate::error::{StorageError, StorageResult};

type Tables = HashMap<String, BTreeMap<String, Vec<u8>>>;

/// Process-local [`KvStore`].
///
/// Rows live in one ordered map per namespace behind a single lock, so each
/// call is atomic. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    tables: RwLock<Tables>,
}

impl MemoryKvStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StorageResult<RwLockReadGuard<'_, Tables>> {
        self.tables.read().map_err(|_| StorageError::Poisoned)
    }

    fn write(&self) -> StorageResult<RwLockWriteGuard<'_, Tables>> {
        self.tables.write().map_err(|_| StorageError::Poisoned)
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        check_address(namespace, key)?;
        Ok(self
            .read()?
            .get(namespace)
            .and_then(|table| table.get(key))
            .cloned())
    }

    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()> {
        check_address(namespace, key)?;
        self.write()?
            .entry(namespace.to_owned())
            .or_default()
            .insert(key.to_owned(), value);
        Ok(())
    }

    async fn insert_if_absent(
        &self,
        namespace: &str,
        key: &str,
        value: Vec<u8>,
    ) -> StorageResult<bool> {
        check_address(namespace, key)?;
        let mut tables = self.write()?;
        let table = tables.entry(namespace.to_owned()).or_default();
        if table.contains_key(key) {
            return Ok(false);
        }
        table.insert(key.to_owned(), value);
        Ok(true)
    }

    async fn compare_and_swap(
        &self,
        namespace: &str,
        key: &str,
        expected: &[u8],
        new: Option<Vec<u8>>,
    ) -> StorageResult<bool> {
        check_address(namespace, key)?;
        let mut tables = self.write()?;
        let Some(table) = tables.get_mut(namespace) else {
            return Ok(false);
        };
        if table.get(key).map(Vec::as_slice) != Some(expected) {
            return Ok(false);
        }
        match new {
            Some(value) => {
                table.insert(key.to_owned(), value);
            },
            None => {
                table.remove(key);
                if table.is_empty() {
                    tables.remove(namespace);
                }
            },
        }
        Ok(true)
    }

    async fn delete(&self, namespace: &str, key: &str) -> StorageResult<bool> {
        check_address(namespace, key)?;
        let mut tables = self.write()?;
        let Some(table) = tables.get_mut(namespace) else {
            return Ok(false);
        };
        let removed = table.remove(key).is_some();
        if table.is_empty() {
            tables.remove(namespace);
        }
        Ok(removed)
    }

    async fn list_keys(&self, namespace: &str) -> StorageResult<Vec<String>> {
        check_segment("namespace", namespace)?;
        Ok(self
            .read()?
            .get(namespace)
            .map(|table| table.keys().cloned().collect())
            .unwrap_or_default())
    }
}
