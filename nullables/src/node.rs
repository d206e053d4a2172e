//! Nullable node: controllable in-memory node state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chainview_node_api::{NodeApiError, NodeFacade};
use chainview_types::{ConnectionDirection, SyncSource, Timestamp};

/// Everything a [`NullNode`] reports. Tests mutate it through
/// [`NullNode::update`] or the convenience setters.
#[derive(Clone, Debug)]
pub struct NodeState {
    pub inbound_peers: usize,
    pub outbound_peers: usize,
    pub block_height: u64,
    pub block_time: Timestamp,
    pub header_height: u64,
    pub header_time: Timestamp,
    pub probable_height: u64,
    pub mempool_tx_count: u64,
    pub mempool_bytes: u64,
    pub bytes_received: u64,
    pub bytes_sent: u64,
    pub initial_block_download: bool,
    pub block_source: SyncSource,
    pub network_active: bool,
    pub alerts: HashMap<String, String>,
}

impl Default for NodeState {
    fn default() -> Self {
        Self {
            inbound_peers: 0,
            outbound_peers: 0,
            block_height: 0,
            block_time: Timestamp::EPOCH,
            header_height: 0,
            header_time: Timestamp::EPOCH,
            probable_height: 0,
            mempool_tx_count: 0,
            mempool_bytes: 0,
            bytes_received: 0,
            bytes_sent: 0,
            initial_block_download: true,
            block_source: SyncSource::None,
            network_active: true,
            alerts: HashMap::new(),
        }
    }
}

/// An in-memory node for tests and simulation.
/// Thread-safe for use from the bridge's blocking poll workers.
pub struct NullNode {
    state: Mutex<NodeState>,
    reachable: AtomicBool,
    query_delay: Mutex<Option<Duration>>,
    queries: AtomicU64,
    network_requests: Mutex<Vec<bool>>,
    alert_lookup_hook: Mutex<Option<AlertLookupHook>>,
}

/// Called with the hash after an alert text lookup has read the state.
pub type AlertLookupHook = Arc<dyn Fn(&str) + Send + Sync>;

impl NullNode {
    pub fn new() -> Self {
        Self::with_state(NodeState::default())
    }

    pub fn with_state(state: NodeState) -> Self {
        Self {
            state: Mutex::new(state),
            reachable: AtomicBool::new(true),
            query_delay: Mutex::new(None),
            queries: AtomicU64::new(0),
            network_requests: Mutex::new(Vec::new()),
            alert_lookup_hook: Mutex::new(None),
        }
    }

    /// Mutate the node state in place.
    pub fn update(&self, f: impl FnOnce(&mut NodeState)) {
        f(&mut self.lock_state());
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> NodeState {
        self.lock_state().clone()
    }

    /// Move the active chain tip (also lifts the header tip if it falls behind).
    pub fn set_block_tip(&self, height: u64, time: Timestamp) {
        self.update(|s| {
            s.block_height = height;
            s.block_time = time;
            if s.header_height < height {
                s.header_height = height;
                s.header_time = time;
            }
        });
    }

    pub fn set_header_tip(&self, height: u64, time: Timestamp) {
        self.update(|s| {
            s.header_height = height;
            s.header_time = time;
        });
    }

    pub fn set_probable_height(&self, height: u64) {
        self.update(|s| s.probable_height = height);
    }

    pub fn set_mempool(&self, tx_count: u64, bytes: u64) {
        self.update(|s| {
            s.mempool_tx_count = tx_count;
            s.mempool_bytes = bytes;
        });
    }

    pub fn set_traffic(&self, received: u64, sent: u64) {
        self.update(|s| {
            s.bytes_received = received;
            s.bytes_sent = sent;
        });
    }

    pub fn set_connections(&self, inbound: usize, outbound: usize) {
        self.update(|s| {
            s.inbound_peers = inbound;
            s.outbound_peers = outbound;
        });
    }

    pub fn put_alert(&self, hash: &str, message: &str) {
        self.update(|s| {
            s.alerts.insert(hash.to_string(), message.to_string());
        });
    }

    pub fn remove_alert(&self, hash: &str) {
        self.update(|s| {
            s.alerts.remove(hash);
        });
    }

    /// Make every query fail with [`NodeApiError::Unreachable`] (or recover).
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Sleep this long inside every query, to model a slow node.
    pub fn set_query_delay(&self, delay: Option<Duration>) {
        *self
            .query_delay
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = delay;
    }

    /// Run `hook` inside every successful `alert_message` lookup, after the
    /// text has been read. Lets a test hold a lookup open while other
    /// callbacks race it.
    pub fn on_alert_lookup(&self, hook: Option<AlertLookupHook>) {
        *self
            .alert_lookup_hook
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = hook;
    }

    /// Number of facade queries answered or refused so far.
    pub fn query_count(&self) -> u64 {
        self.queries.load(Ordering::SeqCst)
    }

    /// Every `set_network_active` request received, in order.
    pub fn network_requests(&self) -> Vec<bool> {
        self.network_requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn lock_state(&self) -> MutexGuard<'_, NodeState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn query<T>(&self, f: impl FnOnce(&NodeState) -> T) -> Result<T, NodeApiError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let delay = *self
            .query_delay
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        if !self.reachable.load(Ordering::SeqCst) {
            return Err(NodeApiError::Unreachable);
        }
        Ok(f(&self.lock_state()))
    }
}

impl Default for NullNode {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeFacade for NullNode {
    fn connection_count(&self, direction: ConnectionDirection) -> Result<usize, NodeApiError> {
        self.query(|s| {
            let mut count = 0;
            if direction.includes_inbound() {
                count += s.inbound_peers;
            }
            if direction.includes_outbound() {
                count += s.outbound_peers;
            }
            count
        })
    }

    fn block_height(&self) -> Result<u64, NodeApiError> {
        self.query(|s| s.block_height)
    }

    fn block_time(&self) -> Result<Timestamp, NodeApiError> {
        self.query(|s| s.block_time)
    }

    fn header_height(&self) -> Result<u64, NodeApiError> {
        self.query(|s| s.header_height)
    }

    fn header_time(&self) -> Result<Timestamp, NodeApiError> {
        self.query(|s| s.header_time)
    }

    fn probable_height(&self) -> Result<u64, NodeApiError> {
        self.query(|s| s.probable_height)
    }

    fn mempool_tx_count(&self) -> Result<u64, NodeApiError> {
        self.query(|s| s.mempool_tx_count)
    }

    fn mempool_bytes(&self) -> Result<u64, NodeApiError> {
        self.query(|s| s.mempool_bytes)
    }

    fn bytes_received(&self) -> Result<u64, NodeApiError> {
        self.query(|s| s.bytes_received)
    }

    fn bytes_sent(&self) -> Result<u64, NodeApiError> {
        self.query(|s| s.bytes_sent)
    }

    fn is_initial_block_download(&self) -> Result<bool, NodeApiError> {
        self.query(|s| s.initial_block_download)
    }

    fn block_source(&self) -> Result<SyncSource, NodeApiError> {
        self.query(|s| s.block_source)
    }

    fn is_network_active(&self) -> Result<bool, NodeApiError> {
        self.query(|s| s.network_active)
    }

    fn set_network_active(&self, active: bool) -> Result<(), NodeApiError> {
        self.query(|_| ())?;
        self.network_requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(active);
        self.update(|s| s.network_active = active);
        tracing::debug!(active, "null node network activity toggled");
        Ok(())
    }

    fn alert_message(&self, hash: &str) -> Result<Option<String>, NodeApiError> {
        let message = self.query(|s| s.alerts.get(hash).cloned())?;
        let hook = self
            .alert_lookup_hook
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        if let Some(hook) = hook {
            hook(hash);
        }
        Ok(message)
    }
}
