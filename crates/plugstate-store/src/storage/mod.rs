//! Storage media behind the state store.
//!
//! A medium is a key → blob map with three operations. The store never
//! looks inside a medium beyond this contract, so a new strategy only needs
//! a new [`StorageMedium`] implementation.

mod durable;
mod session;

pub use durable::DurableStorage;
pub use session::SessionStorage;

use async_trait::async_trait;
use plugstate_core::StateStrategy;
use thiserror::Error;

/// Result type alias for storage medium operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Failures of the underlying medium.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to open database: {0}")]
    Open(String),

    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("table error: {0}")]
    Table(String),

    #[error("read error: {0}")]
    Read(String),

    #[error("write error: {0}")]
    Write(String),

    #[error("quota exceeded: {needed} bytes needed, {quota} byte quota")]
    QuotaExceeded { needed: usize, quota: usize },
}

/// Three-operation contract every persistence medium provides.
#[async_trait]
pub trait StorageMedium: Send + Sync {
    /// The strategy this medium implements.
    fn strategy(&self) -> StateStrategy;

    /// The blob stored under `key`, or `None` if nothing is.
    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Replace whatever is stored under `key`.
    async fn set(&self, key: &str, blob: Vec<u8>) -> StorageResult<()>;

    /// Remove `key`. Removing a missing key succeeds.
    async fn delete(&self, key: &str) -> StorageResult<()>;
}

/// Storage key of a plugin's snapshot.
pub fn storage_key(plugin_id: &str) -> String {
    format!("plugin-state/{plugin_id}")
}
