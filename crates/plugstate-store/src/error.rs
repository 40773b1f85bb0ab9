//! Error types for the plugstate state store.

use plugstate_core::ConfigError;
use thiserror::Error;

use crate::storage::StorageError;

/// Result type alias for state store operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors surfaced to the plugin by state store operations.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("validation failed for field `{field}`: {reason}")]
    Validation { field: String, reason: String },

    #[error("state too large: {size} bytes exceeds the {limit} byte limit")]
    StateTooLarge { size: usize, limit: usize },

    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[from] StorageError),

    #[error("state store is not configured")]
    NotConfigured,

    #[error("persisted state for `{plugin_id}` is corrupt: {reason}")]
    CorruptState { plugin_id: String, reason: String },

    #[error("serialization error: {0}")]
    Serialize(String),
}
