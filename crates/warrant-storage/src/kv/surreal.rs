use std::path::Path;

use async_trait::async_trait;
use surrealkv::{Mode, Tree, TreeBuilder};

use super::{KvStore, SEPARATOR, check_address, check_segment};
use crate::error::{StorageError, StorageResult};

impl From<surrealkv::Error> for StorageError {
    fn from(e: surrealkv::Error) -> Self {
        Self::Backend(e.to_string())
    }
}

/// Persistent [`KvStore`] on an embedded `SurrealKV` tree.
///
/// Rows are stored under `namespace \0 key`. Each call runs in its own
/// transaction; conflicting writers fail at commit.
pub struct SurrealKvStore {
    tree: Tree,
}

impl std::fmt::Debug for SurrealKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurrealKvStore").finish_non_exhaustive()
    }
}

impl SurrealKvStore {
    /// Open (creating if needed) the store rooted at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if the tree cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        let tree = TreeBuilder::new()
            .with_path(path.clone())
            .build()
            .map_err(|e| StorageError::Open {
                path,
                message: e.to_string(),
            })?;
        Ok(Self { tree })
    }
}

fn row_key(namespace: &str, key: &str) -> Vec<u8> {
    let mut row = prefix(namespace, SEPARATOR);
    row.extend_from_slice(key.as_bytes());
    row
}

/// `namespace` followed by one marker byte. `[ns \0, ns \x01)` spans exactly
/// the namespace's rows.
fn prefix(namespace: &str, marker: u8) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(namespace.len().saturating_add(1));
    bytes.extend_from_slice(namespace.as_bytes());
    bytes.push(marker);
    bytes
}

#[async_trait]
impl KvStore for SurrealKvStore {
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        check_address(namespace, key)?;
        let tx = self.tree.begin_with_mode(Mode::ReadOnly)?;
        Ok(tx.get(&row_key(namespace, key))?)
    }

    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()> {
        check_address(namespace, key)?;
        let mut tx = self.tree.begin()?;
        tx.set(&row_key(namespace, key), &value)?;
        Ok(tx.commit().await?)
    }

    async fn insert_if_absent(
        &self,
        namespace: &str,
        key: &str,
        value: Vec<u8>,
    ) -> StorageResult<bool> {
        check_address(namespace, key)?;
        let row = row_key(namespace, key);
        let mut tx = self.tree.begin()?;
        if tx.get(&row)?.is_some() {
            return Ok(false);
        }
        tx.set(&row, &value)?;
        // Snapshot isolation: a racing insert of the same row fails here.
        tx.commit().await?;
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
        let row = row_key(namespace, key);
        let mut tx = self.tree.begin()?;
        if tx.get(&row)?.as_deref() != Some(expected) {
            return Ok(false);
        }
        match new {
            Some(value) => tx.set(&row, &value)?,
            None => tx.delete(&row)?,
        }
        tx.commit().await?;
        Ok(true)
    }

    async fn delete(&self, namespace: &str, key: &str) -> StorageResult<bool> {
        check_address(namespace, key)?;
        let row = row_key(namespace, key);
        let mut tx = self.tree.begin()?;
        if tx.get(&row)?.is_none() {
            return Ok(false);
        }
        tx.delete(&row)?;
        tx.commit().await?;
        Ok(true)
    }

    async fn list_keys(&self, namespace: &str) -> StorageResult<Vec<String>> {
        check_segment("namespace", namespace)?;
        let start = prefix(namespace, SEPARATOR);
        let end = prefix(namespace, SEPARATOR.saturating_add(1));
        let skip = start.len();

        let tx = self.tree.begin_with_mode(Mode::ReadOnly)?;
        let mut rows = tx.range(&start, &end)?;
        rows.seek_first()?;

        let mut keys = Vec::new();
        while rows.valid() {
            let raw = rows.key();
            if raw.len() > skip
                && let Ok(key) = std::str::from_utf8(&raw[skip..])
            {
                keys.push(key.to_owned());
            }
            rows.next()?;
        }
        Ok(keys)
    }
}
