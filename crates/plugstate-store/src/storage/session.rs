//! Session-scoped medium: lives in process memory and dies with the session.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use plugstate_core::StateStrategy;
use tokio::sync::RwLock;
use tracing::debug;

use super::{StorageError, StorageMedium, StorageResult};

/// In-memory key → blob map shared by every clone.
///
/// An optional quota bounds the total size of stored blobs, the way a
/// browser caps `sessionStorage`.
#[derive(Clone, Debug, Default)]
pub struct SessionStorage {
    entries: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    quota: Option<usize>,
}

impl SessionStorage {
    /// An empty medium with no quota.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the sum of stored blob sizes at `bytes`.
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            entries: Arc::default(),
            quota: Some(bytes),
        }
    }

    /// Drop everything, as when the hosting session ends.
    pub async fn end_session(&self) {
        let mut entries = self.entries.write().await;
        let count = entries.len();
        entries.clear();
        debug!(count, "session storage cleared");
    }

    /// Total bytes currently stored.
    pub async fn usage(&self) -> usize {
        self.entries.read().await.values().map(Vec::len).sum()
    }

    /// Number of stored keys.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl StorageMedium for SessionStorage {
    fn strategy(&self) -> StateStrategy {
        StateStrategy::Session
    }

    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, blob: Vec<u8>) -> StorageResult<()> {
        let mut entries = self.entries.write().await;
        if let Some(quota) = self.quota {
            let others: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(_, v)| v.len())
                .sum();
            let needed = others + blob.len();
            if needed > quota {
                return Err(StorageError::QuotaExceeded { needed, quota });
            }
        }
        let size = blob.len();
        entries.insert(key.to_string(), blob);
        debug!(%key, size, "session entry stored");
        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let existed = self.entries.write().await.remove(key).is_some();
        debug!(%key, existed, "session entry deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_delete() {
        let storage = SessionStorage::new();
        storage.set("a", b"{}".to_vec()).await.unwrap();
        assert_eq!(storage.get("a").await.unwrap(), Some(b"{}".to_vec()));

        storage.delete("a").await.unwrap();
        assert_eq!(storage.get("a").await.unwrap(), None);
        // Deleting again is fine.
        storage.delete("a").await.unwrap();
    }

    #[tokio::test]
    async fn clones_share_entries() {
        let storage = SessionStorage::new();
        let other = storage.clone();
        storage.set("a", vec![1, 2, 3]).await.unwrap();
        assert_eq!(other.usage().await, 3);
    }

    #[tokio::test]
    async fn quota_counts_replacement_not_addition() {
        let storage = SessionStorage::with_quota(10);
        storage.set("a", vec![0; 6]).await.unwrap();
        // Replacing "a" frees its old 6 bytes first.
        storage.set("a", vec![0; 10]).await.unwrap();

        let err = storage.set("b", vec![0; 1]).await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::QuotaExceeded {
                needed: 11,
                quota: 10
            }
        ));
        assert_eq!(storage.len().await, 1);
    }

    #[tokio::test]
    async fn end_session_drops_everything() {
        let storage = SessionStorage::new();
        storage.set("a", vec![1]).await.unwrap();
        storage.set("b", vec![2]).await.unwrap();
        storage.end_session().await;
        assert!(storage.is_empty().await);
    }
}
