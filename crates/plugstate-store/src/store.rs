//! StateStore: schema-checked save/restore/clear of one plugin's state.
//!
//! The store holds the active [`Configuration`], the storage medium picked
//! by its strategy, and the lifecycle hooks. Operations are serialized
//! through a FIFO async lock so overlapping calls complete in arrival order.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use plugstate_core::{ConfigError, Configuration, Snapshot, StateStrategy};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{StateError, StateResult};
use crate::hooks::{HookKind, HookRegistry, LifecycleEvent, Subscription};
use crate::storage::{SessionStorage, StorageMedium, storage_key};
use crate::validate::{prepare_for_save, reconcile_restored};

/// A validated configuration bound to its medium.
struct Active {
    config: Configuration,
    defaults: Snapshot,
    medium: Arc<dyn StorageMedium>,
    key: String,
}

struct Inner {
    media: HashMap<StateStrategy, Arc<dyn StorageMedium>>,
    active: RwLock<Option<Arc<Active>>>,
    /// Serializes save/get/clear; tokio's mutex grants the lock in FIFO order.
    op_lock: Mutex<()>,
    hooks: HookRegistry,
}

/// Builder that installs one medium per strategy.
#[derive(Default)]
pub struct StateStoreBuilder {
    media: HashMap<StateStrategy, Arc<dyn StorageMedium>>,
}

impl StateStoreBuilder {
    /// Install `medium` for the strategy it reports. A later medium for the
    /// same strategy replaces the earlier one.
    pub fn medium(mut self, medium: Arc<dyn StorageMedium>) -> Self {
        self.media.insert(medium.strategy(), medium);
        self
    }

    /// Finish the store. It still needs a [`StateStore::configure`] call
    /// before any operation succeeds.
    pub fn build(self) -> StateStore {
        StateStore {
            inner: Arc::new(Inner {
                media: self.media,
                active: RwLock::new(None),
                op_lock: Mutex::new(()),
                hooks: HookRegistry::new(),
            }),
        }
    }
}

/// Per-plugin state store. Cheap to clone; clones share configuration,
/// media, and hooks.
#[derive(Clone)]
pub struct StateStore {
    inner: Arc<Inner>,
}

impl StateStore {
    /// Start a store with no media installed.
    pub fn builder() -> StateStoreBuilder {
        StateStoreBuilder::default()
    }

    /// A store whose only medium is a fresh [`SessionStorage`].
    pub fn in_session() -> Self {
        Self::builder()
            .medium(Arc::new(SessionStorage::new()))
            .build()
    }

    // ── Configuration ──────────────────────────────────────────────

    /// Validate and install `config`, replacing any previous one.
    ///
    /// Nothing changes unless every check passes.
    pub fn configure(&self, config: Configuration) -> StateResult<()> {
        config.validate()?;
        let medium = self
            .inner
            .media
            .get(&config.state_strategy)
            .cloned()
            .ok_or_else(|| {
                ConfigError::invalid(
                    "state_strategy",
                    format!(
                        "no storage medium installed for `{}`",
                        config.state_strategy
                    ),
                )
            })?;

        let active = Active {
            defaults: config.defaults(),
            key: storage_key(&config.plugin_id),
            medium,
            config,
        };
        info!(
            plugin_id = %active.config.plugin_id,
            strategy = %active.config.state_strategy,
            preserved = active.config.preserve_keys.len(),
            max_state_size = active.config.max_state_size,
            "state store configured"
        );

        *self
            .inner
            .active
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(active));
        Ok(())
    }

    /// The active configuration, or `None` before a successful `configure`.
    pub fn configuration(&self) -> Option<Configuration> {
        self.current().map(|active| active.config.clone())
    }

    /// Schema defaults of every preserved field.
    pub fn defaults(&self) -> StateResult<Snapshot> {
        Ok(self.active()?.defaults.clone())
    }

    fn current(&self) -> Option<Arc<Active>> {
        self.inner
            .active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn active(&self) -> StateResult<Arc<Active>> {
        self.current().ok_or(StateError::NotConfigured)
    }

    // ── Operations ─────────────────────────────────────────────────

    /// Persist the preserved fields of `state`, replacing the previous
    /// snapshot. Returns the snapshot as written.
    ///
    /// Nothing is written if validation fails or the encoded snapshot
    /// exceeds `max_state_size`. `saved` hooks run after the write.
    pub async fn save_state(&self, state: Snapshot) -> StateResult<Snapshot> {
        let _guard = self.inner.op_lock.lock().await;
        let active = self.active()?;
        let config = &active.config;

        let prepared = prepare_for_save(config, state)?;
        let blob = prepared
            .to_json_bytes()
            .map_err(|e| StateError::Serialize(e.to_string()))?;
        if blob.len() > config.max_state_size {
            warn!(plugin_id = %config.plugin_id, size = blob.len(), limit = config.max_state_size, "state too large, not saved");
            return Err(StateError::StateTooLarge {
                size: blob.len(),
                limit: config.max_state_size,
            });
        }

        let size = blob.len();
        active.medium.set(&active.key, blob).await?;
        debug!(plugin_id = %config.plugin_id, size, "state saved");

        self.inner
            .hooks
            .dispatch(&LifecycleEvent::Saved(prepared.clone()));
        Ok(prepared)
    }

    /// Load the persisted snapshot, reconciled with the current schema.
    ///
    /// Returns `None` when nothing is persisted; `restored` hooks only run
    /// when a snapshot is returned.
    pub async fn get_state(&self) -> StateResult<Option<Snapshot>> {
        let _guard = self.inner.op_lock.lock().await;
        let active = self.active()?;
        self.restore(&active).await
    }

    /// [`get_state`](Self::get_state), falling back to the defaults of the
    /// configuration the restore ran under.
    pub async fn get_state_or_defaults(&self) -> StateResult<Snapshot> {
        let _guard = self.inner.op_lock.lock().await;
        let active = self.active()?;
        Ok(self
            .restore(&active)
            .await?
            .unwrap_or_else(|| active.defaults.clone()))
    }

    /// Load, decode, and reconcile the persisted snapshot. Callers hold the
    /// operation lock.
    async fn restore(&self, active: &Active) -> StateResult<Option<Snapshot>> {
        let config = &active.config;

        let Some(blob) = active.medium.get(&active.key).await? else {
            debug!(plugin_id = %config.plugin_id, "no persisted state");
            return Ok(None);
        };
        let persisted =
            Snapshot::from_json_bytes(&blob).map_err(|e| StateError::CorruptState {
                plugin_id: config.plugin_id.clone(),
                reason: e.to_string(),
            })?;

        let restored = reconcile_restored(config, &persisted);
        debug!(plugin_id = %config.plugin_id, fields = restored.len(), "state restored");

        self.inner
            .hooks
            .dispatch(&LifecycleEvent::Restored(restored.clone()));
        Ok(Some(restored))
    }

    /// Delete the persisted snapshot. Clearing an empty store succeeds.
    pub async fn clear_state(&self) -> StateResult<()> {
        let _guard = self.inner.op_lock.lock().await;
        let active = self.active()?;

        active.medium.delete(&active.key).await?;
        info!(plugin_id = %active.config.plugin_id, "state cleared");

        self.inner.hooks.dispatch(&LifecycleEvent::Cleared);
        Ok(())
    }

    // ── Lifecycle hooks ────────────────────────────────────────────

    /// Run `callback` with the persisted snapshot after every save.
    pub fn on_save<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Snapshot) + Send + Sync + 'static,
    {
        self.inner.hooks.subscribe(
            HookKind::Saved,
            Arc::new(move |event: &LifecycleEvent| {
                if let LifecycleEvent::Saved(snapshot) = event {
                    callback(snapshot);
                }
            }),
        )
    }

    /// Run `callback` with the reconciled snapshot after every restore.
    pub fn on_restore<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Snapshot) + Send + Sync + 'static,
    {
        self.inner.hooks.subscribe(
            HookKind::Restored,
            Arc::new(move |event: &LifecycleEvent| {
                if let LifecycleEvent::Restored(snapshot) = event {
                    callback(snapshot);
                }
            }),
        )
    }

    /// Run `callback` after every successful clear, including clears of an
    /// empty store.
    pub fn on_clear<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.hooks.subscribe(
            HookKind::Cleared,
            Arc::new(move |_: &LifecycleEvent| callback()),
        )
    }

    /// The registry behind `on_save`, `on_restore`, and `on_clear`.
    pub fn hooks(&self) -> &HookRegistry {
        &self.inner.hooks
    }
}
