//! Subscription to asynchronous node events.

use std::sync::Arc;

use chainview_types::NodeEvent;

use crate::NodeApiError;

/// Callback invoked by the node for every event, on whichever node thread
/// produced it. Handlers may run concurrently with each other.
pub type EventHandler = Arc<dyn Fn(&NodeEvent) + Send + Sync>;

/// One live registration with a [`NodeEventRegistry`].
///
/// Deliberately neither `Clone` nor `Copy`: giving it back to
/// [`NodeEventRegistry::unsubscribe`] consumes it, so a registration can be
/// released at most once.
#[derive(Debug, PartialEq, Eq, Hash)]
#[must_use = "dropping a handle leaves the registration active"]
pub struct SubscriptionHandle(u64);

impl SubscriptionHandle {
    /// Wrap a registry-assigned identifier.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Registry of event handlers maintained by the node.
pub trait NodeEventRegistry: Send + Sync {
    /// Register a handler. Every call creates a distinct registration.
    fn subscribe(&self, handler: EventHandler) -> Result<SubscriptionHandle, NodeApiError>;

    /// Remove a registration. Once this returns the node starts no new
    /// invocation of the handler. Unknown handles are ignored.
    fn unsubscribe(&self, handle: SubscriptionHandle);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_exposes_its_id() {
        let handle = SubscriptionHandle::new(42);
        assert_eq!(handle.id(), 42);
        assert_eq!(handle, SubscriptionHandle::new(42));
    }
}
