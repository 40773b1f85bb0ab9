//! Lifecycle hook registry.
//!
//! Callbacks are kept in one id-keyed list in registration order. Each
//! [`Subscription`] remembers its id and a weak back reference to the list,
//! so unsubscribing removes exactly one entry and never keeps the registry
//! alive.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use plugstate_core::Snapshot;
use tracing::{debug, error};

/// Which lifecycle event a callback listens for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    Saved,
    Restored,
    Cleared,
}

/// Payload handed to callbacks.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    /// The snapshot exactly as persisted.
    Saved(Snapshot),
    /// The snapshot after defaults were filled in.
    Restored(Snapshot),
    Cleared,
}

impl LifecycleEvent {
    /// Which registrations this event is dispatched to.
    pub fn kind(&self) -> HookKind {
        match self {
            LifecycleEvent::Saved(_) => HookKind::Saved,
            LifecycleEvent::Restored(_) => HookKind::Restored,
            LifecycleEvent::Cleared => HookKind::Cleared,
        }
    }
}

pub type HookCallback = Arc<dyn Fn(&LifecycleEvent) + Send + Sync>;

struct HookEntry {
    id: u64,
    kind: HookKind,
    callback: HookCallback,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: Vec<HookEntry>,
}

/// Ordered set of lifecycle callbacks.
#[derive(Clone, Default)]
pub struct HookRegistry {
    inner: Arc<Mutex<Registry>>,
}

impl HookRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        // Callbacks never run under this lock, so a poisoned guard still
        // holds a consistent list.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `callback` for events of `kind`. It runs after every
    /// callback registered before it.
    pub fn subscribe(&self, kind: HookKind, callback: HookCallback) -> Subscription {
        let mut registry = self.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.entries.push(HookEntry { id, kind, callback });
        debug!(?kind, id, "lifecycle hook registered");

        Subscription {
            id,
            kind,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Number of live callbacks registered for `kind`.
    pub fn subscriber_count(&self, kind: HookKind) -> usize {
        self.lock()
            .entries
            .iter()
            .filter(|entry| entry.kind == kind)
            .count()
    }

    /// Invoke every callback registered for the event's kind, in
    /// registration order.
    ///
    /// The callback set is copied before the first call, so callbacks may
    /// subscribe or unsubscribe freely: the current dispatch still runs
    /// exactly the callbacks that were registered when it started. A
    /// panicking callback is logged and skipped. Returns the number of
    /// callbacks that panicked.
    pub fn dispatch(&self, event: &LifecycleEvent) -> usize {
        let kind = event.kind();
        let callbacks: Vec<(u64, HookCallback)> = self
            .lock()
            .entries
            .iter()
            .filter(|entry| entry.kind == kind)
            .map(|entry| (entry.id, Arc::clone(&entry.callback)))
            .collect();

        let mut failed = 0;
        for (id, callback) in callbacks {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| callback(event))) {
                failed += 1;
                error!(?kind, id, reason = panic_message(&*payload), "lifecycle callback panicked");
            }
        }
        failed
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

fn remove_entry(registry: &Mutex<Registry>, id: u64) -> bool {
    let mut registry = registry.lock().unwrap_or_else(PoisonError::into_inner);
    let before = registry.entries.len();
    registry.entries.retain(|entry| entry.id != id);
    registry.entries.len() != before
}

/// Handle returned by a registration. Dropping it leaves the callback
/// registered; call [`Subscription::unsubscribe`] to remove it.
#[derive(Debug, Clone)]
pub struct Subscription {
    id: u64,
    kind: HookKind,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// Remove this callback. Calling it again is a no-op.
    pub fn unsubscribe(&self) {
        if let Some(registry) = self.registry.upgrade()
            && remove_entry(&registry, self.id)
        {
            debug!(kind = ?self.kind, id = self.id, "lifecycle hook removed");
        }
    }

    /// Whether the callback is still registered.
    pub fn is_active(&self) -> bool {
        self.registry.upgrade().is_some_and(|registry| {
            registry
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .entries
                .iter()
                .any(|entry| entry.id == self.id)
        })
    }
}
