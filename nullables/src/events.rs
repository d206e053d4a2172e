//! Nullable event registry: fire node events on demand.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::RwLock;

use chainview_node_api::{EventHandler, NodeApiError, NodeEventRegistry, SubscriptionHandle};
use chainview_types::NodeEvent;

/// A registry that delivers events only when a test calls [`fire`](Self::fire).
pub struct NullEventRegistry {
    handlers: RwLock<BTreeMap<u64, EventHandler>>,
    next_id: AtomicU64,
    refuse_subscriptions: AtomicBool,
    unsubscribe_calls: AtomicUsize,
}

impl NullEventRegistry {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            refuse_subscriptions: AtomicBool::new(false),
            unsubscribe_calls: AtomicUsize::new(0),
        }
    }

    /// Deliver `event` to every registered handler on the calling thread.
    /// Returns how many handlers were invoked.
    ///
    /// Handlers are invoked outside the registry lock so they may run
    /// concurrently with `subscribe`/`unsubscribe` from other threads.
    pub fn fire(&self, event: &NodeEvent) -> usize {
        let handlers = self.snapshot_handlers();
        for handler in &handlers {
            handler(event);
        }
        handlers.len()
    }

    /// Clones of every registered handler. A caller that keeps one can
    /// still invoke it after the registration is gone, the way a node
    /// thread already inside a callback would.
    pub fn snapshot_handlers(&self) -> Vec<EventHandler> {
        self.handlers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .values()
            .cloned()
            .collect()
    }

    /// Number of live registrations.
    pub fn active_subscriptions(&self) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Number of `unsubscribe` calls received, including ones for unknown handles.
    pub fn unsubscribe_calls(&self) -> usize {
        self.unsubscribe_calls.load(Ordering::SeqCst)
    }

    /// Make `subscribe` fail with [`NodeApiError::ShuttingDown`].
    pub fn set_refuse_subscriptions(&self, refuse: bool) {
        self.refuse_subscriptions.store(refuse, Ordering::SeqCst);
    }
}

impl Default for NullEventRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeEventRegistry for NullEventRegistry {
    fn subscribe(&self, handler: EventHandler) -> Result<SubscriptionHandle, NodeApiError> {
        if self.refuse_subscriptions.load(Ordering::SeqCst) {
            return Err(NodeApiError::ShuttingDown);
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.handlers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(id, handler);
        tracing::trace!(id, "null registry subscription added");
        Ok(SubscriptionHandle::new(id))
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        self.unsubscribe_calls.fetch_add(1, Ordering::SeqCst);
        let removed = self
            .handlers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&handle.id());
        tracing::trace!(id = handle.id(), removed = removed.is_some(), "null registry unsubscribe");
    }
}
