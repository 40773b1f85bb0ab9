//! Durable medium backed by redb.
//!
//! Snapshots are stored as raw bytes in the [`PLUGIN_STATE`] table. The
//! database is either file-backed or held in memory (the latter for
//! testing).

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use plugstate_core::StateStrategy;
use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use super::{StorageError, StorageMedium, StorageResult};
use crate::tables::PLUGIN_STATE;

/// Convert any `Display` error into a `StorageError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StorageError::$variant(e.to_string())
    };
}

/// Thread-safe durable medium backed by redb.
#[derive(Clone)]
pub struct DurableStorage {
    db: Arc<Database>,
}

impl DurableStorage {
    /// Open (or create) a database at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let storage = Self { db: Arc::new(db) };
        storage.ensure_tables()?;
        debug!(?path, "durable storage opened");
        Ok(storage)
    }

    /// Create an ephemeral in-memory database (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let storage = Self { db: Arc::new(db) };
        storage.ensure_tables()?;
        debug!("in-memory durable storage opened");
        Ok(storage)
    }

    fn ensure_tables(&self) -> StorageResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(PLUGIN_STATE).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Storage keys that currently hold a snapshot.
    pub fn keys(&self) -> StorageResult<Vec<String>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(PLUGIN_STATE).map_err(map_err!(Table))?;
        let mut keys = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, _) = entry.map_err(map_err!(Read))?;
            keys.push(key.value().to_string());
        }
        Ok(keys)
    }
}

#[async_trait]
impl StorageMedium for DurableStorage {
    fn strategy(&self) -> StateStrategy {
        StateStrategy::Durable
    }

    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(PLUGIN_STATE).map_err(map_err!(Table))?;
        let value = table
            .get(key)
            .map_err(map_err!(Read))?
            .map(|guard| guard.value().to_vec());
        Ok(value)
    }

    async fn set(&self, key: &str, blob: Vec<u8>) -> StorageResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(PLUGIN_STATE).map_err(map_err!(Table))?;
            table
                .insert(key, blob.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, size = blob.len(), "snapshot stored");
        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut table = txn.open_table(PLUGIN_STATE).map_err(map_err!(Table))?;
            existed = table.remove(key).map_err(map_err!(Write))?.is_some();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, existed, "snapshot deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_and_get() {
        let storage = DurableStorage::open_in_memory().unwrap();
        storage
            .set("plugin-state/a", br#"{"counter":1}"#.to_vec())
            .await
            .unwrap();

        let blob = storage.get("plugin-state/a").await.unwrap();
        assert_eq!(blob.as_deref(), Some(&br#"{"counter":1}"#[..]));
        assert_eq!(storage.keys().unwrap(), vec!["plugin-state/a".to_string()]);
    }

    #[tokio::test]
    async fn set_replaces_previous_blob() {
        let storage = DurableStorage::open_in_memory().unwrap();
        storage.set("k", b"one".to_vec()).await.unwrap();
        storage.set("k", b"two".to_vec()).await.unwrap();
        assert_eq!(storage.get("k").await.unwrap(), Some(b"two".to_vec()));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let storage = DurableStorage::open_in_memory().unwrap();
        storage.set("k", b"{}".to_vec()).await.unwrap();
        storage.delete("k").await.unwrap();
        storage.delete("k").await.unwrap();
        assert!(storage.get("k").await.unwrap().is_none());
        assert!(storage.keys().unwrap().is_empty());
    }

    #[tokio::test]
    async fn persistence_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.redb");

        {
            let storage = DurableStorage::open(&db_path).unwrap();
            storage.set("k", b"{}".to_vec()).await.unwrap();
        }

        // Reopen the same database file.
        let storage = DurableStorage::open(&db_path).unwrap();
        assert_eq!(storage.get("k").await.unwrap(), Some(b"{}".to_vec()));
    }
}
