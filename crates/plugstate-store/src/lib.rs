//! plugstate-store: the host side of plugin state persistence.
//!
//! A plugin configures a [`StateStore`] with its schema and strategy, then
//! saves, restores, and clears a [`Snapshot`] of its UI state. Every
//! operation is checked against the schema and the size limit before the
//! snapshot reaches storage.
//!
//! # Architecture
//!
//! ```text
//! StateStore
//!   ├── active Configuration (+ schema-derived defaults)
//!   ├── FIFO operation lock (save / get / clear run in arrival order)
//!   ├── StorageMedium per StateStrategy
//!   │   ├── SessionStorage  (in-process, dropped with the session)
//!   │   └── DurableStorage  (redb, file-backed or in-memory)
//!   └── HookRegistry (saved / restored / cleared callbacks)
//! ```
//!
//! Media are injected through [`StateStore::builder`]; a strategy with no
//! medium installed is rejected at `configure` time.

pub mod error;
pub mod hooks;
pub mod storage;
pub mod store;
pub mod tables;
mod validate;

pub use error::{StateError, StateResult};
pub use hooks::{HookKind, HookRegistry, LifecycleEvent, Subscription};
pub use storage::{DurableStorage, SessionStorage, StorageError, StorageMedium, StorageResult};
pub use store::{StateStore, StateStoreBuilder};

pub use plugstate_core::{
    ConfigError, Configuration, FieldSchema, FieldType, Snapshot, StateStrategy,
    ValidationPolicy,
};
