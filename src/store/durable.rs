//! ACID-durable key-value store backed by redb.
//!
//! Holds the knowledge-graph snapshot and the resolver state. Writes that
//! must land together go through [`DurableStore::put_many`], which commits
//! every pair in a single transaction.

use std::path::Path;

use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition, TableError};

use crate::error::StoreError;
use crate::store::StoreResult;

/// Snapshot blobs, byte keys to byte values.
const STATE_TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("state");

/// Database file name inside the data directory.
pub const DB_FILE_NAME: &str = "canon-kg.redb";

/// Wrap a redb failure with the operation that hit it.
fn redb_err<E: std::fmt::Display>(op: &'static str) -> impl FnOnce(E) -> StoreError {
    move |e| StoreError::Redb {
        message: format!("{op} failed: {e}"),
    }
}

/// Single-table redb database.
///
/// Reads see MVCC snapshots, so a reader never observes half of a
/// `put_many`.
pub struct DurableStore {
    db: Database,
}

impl DurableStore {
    /// Open or create `canon-kg.redb` in `data_dir`, creating the directory.
    pub fn open(data_dir: &Path) -> StoreResult<Self> {
        std::fs::create_dir_all(data_dir).map_err(|source| StoreError::Io { source })?;
        let path = data_dir.join(DB_FILE_NAME);
        let db = Database::create(&path).map_err(|e| StoreError::Redb {
            message: format!("failed to open redb at {}: {e}", path.display()),
        })?;
        tracing::debug!(path = %path.display(), "opened durable store");
        Ok(Self { db })
    }

    pub fn put(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.put_many(&[(key, value)])
    }

    /// Write several pairs atomically: every pair is committed or none is.
    pub fn put_many(&self, entries: &[(&[u8], &[u8])]) -> StoreResult<()> {
        let txn = self.db.begin_write().map_err(redb_err("begin_write"))?;
        {
            let mut table = txn.open_table(STATE_TABLE).map_err(redb_err("open_table"))?;
            for &(key, value) in entries {
                table.insert(key, value).map_err(redb_err("insert"))?;
            }
        }
        txn.commit().map_err(redb_err("commit"))
    }

    /// Read a value. A database that was never written to has no keys.
    pub fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        let txn = self.db.begin_read().map_err(redb_err("begin_read"))?;
        let table = match txn.open_table(STATE_TABLE) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(redb_err("open_table")(e)),
        };
        let value = table.get(key).map_err(redb_err("get"))?;
        Ok(value.map(|guard| guard.value().to_vec()))
    }

    /// Every stored key, in byte order.
    pub fn keys(&self) -> StoreResult<Vec<Vec<u8>>> {
        let txn = self.db.begin_read().map_err(redb_err("begin_read"))?;
        let table = match txn.open_table(STATE_TABLE) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(redb_err("open_table")(e)),
        };
        let mut keys = Vec::with_capacity(table.len().map_err(redb_err("len"))? as usize);
        for entry in table.iter().map_err(redb_err("iter"))? {
            let (key, _) = entry.map_err(redb_err("iter"))?;
            keys.push(key.value().to_vec());
        }
        Ok(keys)
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        self.keys().map(|k| k.is_empty())
    }
}

impl std::fmt::Debug for DurableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn fresh_database_has_no_keys() {
        let dir = TempDir::new().unwrap();
        let store = DurableStore::open(dir.path()).unwrap();
        assert_eq!(store.get(b"store:snapshot").unwrap(), None);
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn put_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = DurableStore::open(dir.path()).unwrap();

        store.put(b"resolver:state", b"v1").unwrap();
        store.put(b"resolver:state", b"v2").unwrap();
        assert_eq!(store.get(b"resolver:state").unwrap(), Some(b"v2".to_vec()));
        assert_eq!(store.keys().unwrap().len(), 1);
    }

    #[test]
    fn put_many_commits_all_pairs() {
        let dir = TempDir::new().unwrap();
        let store = DurableStore::open(dir.path()).unwrap();

        store
            .put_many(&[
                (b"store:snapshot".as_slice(), b"{}".as_slice()),
                (b"resolver:state".as_slice(), b"\x00".as_slice()),
            ])
            .unwrap();
        assert_eq!(
            store.keys().unwrap(),
            vec![b"resolver:state".to_vec(), b"store:snapshot".to_vec()]
        );
    }

    #[test]
    fn values_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = DurableStore::open(dir.path()).unwrap();
            store.put(b"store:snapshot", b"{\"nodes\":[]}").unwrap();
        }

        let store = DurableStore::open(dir.path()).unwrap();
        assert_eq!(
            store.get(b"store:snapshot").unwrap(),
            Some(b"{\"nodes\":[]}".to_vec())
        );
        assert!(!store.is_empty().unwrap());
    }
}
