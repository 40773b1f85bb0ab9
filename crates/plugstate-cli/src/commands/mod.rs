pub mod demo;
pub mod init;
pub mod state;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use plugstate_core::{Configuration, StateStrategy};
use plugstate_store::{DurableStorage, SessionStorage, StateStore};
use tracing::info;

/// Database file inside the data directory.
pub const DB_FILE: &str = "plugstate.redb";

/// Build a store with the media `config` needs and configure it.
///
/// The durable database is only opened (and the data directory only
/// created) for the durable strategy.
pub fn open_store(data_dir: &Path, config: Configuration) -> anyhow::Result<StateStore> {
    let mut builder = StateStore::builder().medium(Arc::new(SessionStorage::new()));

    if config.state_strategy == StateStrategy::Durable {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("creating {}", data_dir.display()))?;
        let db_path = data_dir.join(DB_FILE);
        let storage = DurableStorage::open(&db_path)?;
        info!(path = ?db_path, "durable storage opened");
        builder = builder.medium(Arc::new(storage));
    }

    let store = builder.build();
    store.configure(config)?;
    Ok(store)
}

pub fn load_store(data_dir: &Path, config_path: &Path) -> anyhow::Result<StateStore> {
    let config = Configuration::from_file(config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    open_store(data_dir, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_strategy_skips_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        let mut config = Configuration::scaffold("demo");
        config.state_strategy = StateStrategy::Session;

        open_store(&data_dir, config).unwrap();
        assert!(!data_dir.exists());
    }

    #[test]
    fn durable_strategy_opens_database() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");

        let store = open_store(&data_dir, Configuration::scaffold("demo")).unwrap();
        assert!(data_dir.join(DB_FILE).exists());
        assert_eq!(
            store.configuration().map(|c| c.plugin_id),
            Some("demo".to_string())
        );
    }
}
