//! Client bridge: keeps one consumer's view of a running node in sync.
//!
//! The bridge:
//! - Caches the best header tip in atomics for lock-free reads
//! - Subscribes to node events and forwards them as client notifications
//! - Re-reads block, mempool and traffic state on a fixed poll interval
//! - Announces a value only when it differs from the last one announced

pub mod alerts;
pub mod bridge;
pub mod config;
pub mod emitter;
pub mod error;
pub mod header_cache;
pub mod metrics;
pub mod notification;
pub mod scheduler;
pub mod shutdown;

pub use alerts::{AlertBook, WARNING_SEPARATOR};
pub use bridge::{ClientBridge, ClientBridgeBuilder, CLIENT_VERSION};
pub use config::{BridgeConfig, MAX_POLL_INTERVAL_MS};
pub use emitter::{BlockTip, ChangeEmitter, MempoolStats, PollObservation, TrafficTotals};
pub use error::BridgeError;
pub use header_cache::{HeaderCache, HeaderTip};
pub use metrics::BridgeMetrics;
pub use notification::{ClientNotification, NotificationBus, NotificationListener};
pub use scheduler::{PollJob, PollScheduler, TickOutcome};
pub use shutdown::ShutdownController;
