//! redb table definitions for durable plugin state.
//!
//! Keys are storage keys (`plugin-state/{plugin_id}`), values are compact
//! JSON snapshots.

use redb::TableDefinition;

/// Persisted snapshots keyed by storage key.
pub const PLUGIN_STATE: TableDefinition<&str, &[u8]> = TableDefinition::new("plugin_state");
