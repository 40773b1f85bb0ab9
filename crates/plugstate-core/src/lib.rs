//! plugstate-core: the types a plugin uses to describe the state it wants
//! persisted by the host.
//!
//! A [`Configuration`] names the plugin, picks a persistence strategy, and
//! declares a schema for every field the plugin may save. Field values travel
//! as a [`Snapshot`], a JSON object keyed by field name.

pub mod config;
pub mod error;
pub mod schema;
pub mod snapshot;

pub use config::{Configuration, StateStrategy, ValidationPolicy};
pub use error::{ConfigError, ConfigResult};
pub use schema::{FieldSchema, FieldType};
pub use snapshot::Snapshot;
