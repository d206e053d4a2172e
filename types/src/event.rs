//! Asynchronous events a node delivers to its observers.

use serde::{Deserialize, Serialize};

use crate::AlertStatus;

/// Severity attached to a user-facing [`NodeEvent::Message`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageStyle {
    Information,
    Warning,
    Error,
}

/// State transitions pushed by the node, possibly from several threads at once.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeEvent {
    /// The number of connected peers changed.
    NumConnectionsChanged(usize),
    /// Network activity was switched on or off.
    NetworkActiveChanged(bool),
    /// A network alert appeared, changed or expired.
    AlertChanged { hash: String, status: AlertStatus },
    /// A wallet problem the user should see.
    WalletAlert(String),
    /// The set of banned peers changed.
    BanListChanged,
    /// Header download progress.
    HeaderProgress { current: u64, total: u64 },
    /// Lightweight (SPV) sync progress.
    SpvProgress {
        start_height: u64,
        processed_height: u64,
        probable_height: u64,
    },
    /// Long-running operation progress, e.g. chain verification at startup.
    ShowProgress { title: String, percent: u8 },
    /// A message for the user.
    Message {
        title: String,
        message: String,
        style: MessageStyle,
    },
}

impl NodeEvent {
    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NumConnectionsChanged(_) => "num_connections",
            Self::NetworkActiveChanged(_) => "network_active",
            Self::AlertChanged { .. } => "alert",
            Self::WalletAlert(_) => "wallet_alert",
            Self::BanListChanged => "ban_list",
            Self::HeaderProgress { .. } => "header_progress",
            Self::SpvProgress { .. } => "spv_progress",
            Self::ShowProgress { .. } => "show_progress",
            Self::Message { .. } => "message",
        }
    }
}
