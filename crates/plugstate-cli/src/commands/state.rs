use anyhow::Context;
use plugstate_core::Snapshot;
use plugstate_store::StateStore;

/// Parse `state` as a JSON object and save it.
pub async fn save(store: &StateStore, state: &str) -> anyhow::Result<()> {
    let snapshot: Snapshot =
        serde_json::from_str(state).context("state must be a JSON object")?;
    let saved = store.save_state(snapshot).await?;
    println!("{}", serde_json::to_string_pretty(&saved)?);
    Ok(())
}

/// Print the restored state, or the schema defaults with `--defaults`.
pub async fn get(store: &StateStore, defaults: bool) -> anyhow::Result<()> {
    let state = if defaults {
        Some(store.get_state_or_defaults().await?)
    } else {
        store.get_state().await?
    };

    match state {
        Some(state) => println!("{}", serde_json::to_string_pretty(&state)?),
        None => println!("no state"),
    }
    Ok(())
}

/// Delete the persisted state.
pub async fn clear(store: &StateStore) -> anyhow::Result<()> {
    store.clear_state().await?;
    if let Some(config) = store.configuration() {
        println!("✓ Cleared state for {}", config.plugin_id);
    }
    Ok(())
}
