//! Synchronous node state queries.

use chainview_types::{ConnectionDirection, SyncSource, Timestamp};

use crate::NodeApiError;

/// Read access to live node state, plus the one network toggle.
///
/// Implementations are called from the bridge's poll cycle (on a blocking
/// worker thread) and from arbitrary consumer threads. Calls should have
/// bounded latency but are allowed to block briefly on node locks.
pub trait NodeFacade: Send + Sync {
    /// Number of connected peers matching `direction`.
    fn connection_count(&self, direction: ConnectionDirection) -> Result<usize, NodeApiError>;

    /// Height of the active chain tip.
    fn block_height(&self) -> Result<u64, NodeApiError>;
    /// Timestamp of the active chain tip.
    fn block_time(&self) -> Result<Timestamp, NodeApiError>;

    /// Height of the best validated header.
    fn header_height(&self) -> Result<u64, NodeApiError>;
    /// Timestamp of the best validated header.
    fn header_time(&self) -> Result<Timestamp, NodeApiError>;

    /// Estimated network chain height, possibly ahead of the local tip.
    fn probable_height(&self) -> Result<u64, NodeApiError>;

    fn mempool_tx_count(&self) -> Result<u64, NodeApiError>;
    /// Dynamic memory usage of the mempool in bytes.
    fn mempool_bytes(&self) -> Result<u64, NodeApiError>;

    fn bytes_received(&self) -> Result<u64, NodeApiError>;
    fn bytes_sent(&self) -> Result<u64, NodeApiError>;

    fn is_initial_block_download(&self) -> Result<bool, NodeApiError>;
    fn block_source(&self) -> Result<SyncSource, NodeApiError>;

    fn is_network_active(&self) -> Result<bool, NodeApiError>;
    /// Enable or disable all peer networking. The node reports the
    /// resulting state change through its event registry.
    fn set_network_active(&self, active: bool) -> Result<(), NodeApiError>;

    /// Text of an alert by hash, `None` if the node no longer knows it.
    fn alert_message(&self, hash: &str) -> Result<Option<String>, NodeApiError>;
}
