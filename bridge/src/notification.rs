//! Change notifications delivered to the bridge's consumer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use serde::Serialize;
use tokio::sync::mpsc;

use chainview_types::{MessageStyle, Timestamp};

/// Observable node state changes, one variant per consumer-facing signal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum ClientNotification {
    NumConnectionsChanged(usize),
    NumBlocksChanged { count: u64, block_time: Timestamp },
    MempoolSizeChanged { count: u64, bytes: u64 },
    NetworkActiveChanged(bool),
    /// Aggregated status-bar warnings, empty when no alert is active.
    AlertsChanged(String),
    BytesChanged { received: u64, sent: u64 },
    HeaderProgressChanged { current: u64, total: u64 },
    SpvProgressChanged {
        start_height: u64,
        processed_height: u64,
        probable_height: u64,
    },
    Message {
        title: String,
        message: String,
        style: MessageStyle,
    },
    WalletAlert(String),
    ShowProgress { title: String, percent: u8 },
    BanListChanged,
}

impl ClientNotification {
    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NumConnectionsChanged(_) => "num_connections",
            Self::NumBlocksChanged { .. } => "num_blocks",
            Self::MempoolSizeChanged { .. } => "mempool_size",
            Self::NetworkActiveChanged(_) => "network_active",
            Self::AlertsChanged(_) => "alerts",
            Self::BytesChanged { .. } => "bytes",
            Self::HeaderProgressChanged { .. } => "header_progress",
            Self::SpvProgressChanged { .. } => "spv_progress",
            Self::Message { .. } => "message",
            Self::WalletAlert(_) => "wallet_alert",
            Self::ShowProgress { .. } => "show_progress",
            Self::BanListChanged => "ban_list",
        }
    }
}

/// A consumer callback for [`NotificationBus::subscribe`].
pub type NotificationListener = Box<dyn Fn(&ClientNotification) + Send + Sync>;

/// Returns `false` once it can never deliver again, so the bus drops it.
type Listener = Box<dyn Fn(&ClientNotification) -> bool + Send + Sync>;

/// Synchronous fan-out of [`ClientNotification`]s.
///
/// Listeners are invoked inline on the emitting thread while the emitter
/// holds its snapshot lock; keep handlers fast and never call back into the
/// bridge's emitting paths from one. Use [`subscribe_channel`] to move work
/// onto an async task instead.
///
/// [`subscribe_channel`]: NotificationBus::subscribe_channel
pub struct NotificationBus {
    listeners: RwLock<Vec<(u64, Listener)>>,
    next_id: AtomicU64,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self, listener: NotificationListener) {
        self.push(Box::new(move |notification: &ClientNotification| {
            listener(notification);
            true
        }));
    }

    /// Forward every notification into an unbounded channel.
    ///
    /// The listener is removed on the first emit after the receiver is
    /// dropped.
    pub fn subscribe_channel(&self) -> mpsc::UnboundedReceiver<ClientNotification> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.push(Box::new(move |notification: &ClientNotification| {
            tx.send(notification.clone()).is_ok()
        }));
        rx
    }

    fn push(&self, listener: Listener) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((id, listener));
    }

    pub fn emit(&self, notification: &ClientNotification) {
        let closed: Vec<u64> = {
            let listeners = self
                .listeners
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            listeners
                .iter()
                .filter(|(_, listener)| !listener(notification))
                .map(|(id, _)| *id)
                .collect()
        };
        if closed.is_empty() {
            return;
        }

        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        listeners.retain(|(id, _)| !closed.contains(id));
        tracing::debug!(removed = closed.len(), "dropped closed notification channels");
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new()
    }
}
