//! Change-notification emitter.
//!
//! Turns a high-frequency stream of observations (every poll cycle, every
//! node callback) into a low-frequency stream of notifications: a field is
//! announced only when its value differs from the last value announced for
//! it. Composite fields (block count + date, mempool size + bytes, ...)
//! are announced when any part differs.
//!
//! The comparison, the snapshot update and the listener calls all happen
//! under one mutex. Consequences:
//! - listeners never run concurrently with each other;
//! - one poll cycle updates the snapshot exactly once, however many fields
//!   changed;
//! - the same value is never announced twice in a row for a field, even
//!   when a callback and a poll cycle race.

use std::sync::{Arc, Mutex, MutexGuard};

use chainview_types::Timestamp;

use crate::notification::{ClientNotification, NotificationBus};

/// Active chain tip as seen by one poll cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockTip {
    pub height: u64,
    pub time: Timestamp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MempoolStats {
    pub tx_count: u64,
    /// Dynamic memory usage in bytes.
    pub bytes: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrafficTotals {
    pub received: u64,
    pub sent: u64,
}

/// Values fetched by one reconciliation cycle. A group the node failed to
/// answer is `None` and leaves its snapshot entry untouched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PollObservation {
    pub block_tip: Option<BlockTip>,
    pub mempool: Option<MempoolStats>,
    pub traffic: Option<TrafficTotals>,
}

/// Last announced value per field. `None` means never announced, so the
/// first observation of every field is always announced.
#[derive(Debug, Default)]
struct LastEmittedSnapshot {
    num_connections: Option<usize>,
    block_tip: Option<BlockTip>,
    mempool: Option<MempoolStats>,
    network_active: Option<bool>,
    traffic: Option<TrafficTotals>,
    alerts: Option<String>,
    header_progress: Option<(u64, u64)>,
    spv_progress: Option<(u64, u64, u64)>,
}

/// Record `value` in `slot` and report whether it differed.
fn replace_if_changed<T: PartialEq>(slot: &mut Option<T>, value: T) -> bool {
    if slot.as_ref() == Some(&value) {
        return false;
    }
    *slot = Some(value);
    true
}

pub struct ChangeEmitter {
    last: Mutex<LastEmittedSnapshot>,
    bus: Arc<NotificationBus>,
}

impl ChangeEmitter {
    pub fn new(bus: Arc<NotificationBus>) -> Self {
        Self {
            last: Mutex::new(LastEmittedSnapshot::default()),
            bus,
        }
    }

    pub fn bus(&self) -> &Arc<NotificationBus> {
        &self.bus
    }

    /// Compare one poll cycle's values with the snapshot and announce the
    /// changed ones. Returns how many notifications were emitted.
    pub fn observe_poll(&self, observation: &PollObservation) -> usize {
        let mut last = self.lock();
        let mut pending = Vec::with_capacity(3);

        if let Some(tip) = observation.block_tip {
            if replace_if_changed(&mut last.block_tip, tip) {
                pending.push(ClientNotification::NumBlocksChanged {
                    count: tip.height,
                    block_time: tip.time,
                });
            }
        }
        if let Some(mempool) = observation.mempool {
            if replace_if_changed(&mut last.mempool, mempool) {
                pending.push(ClientNotification::MempoolSizeChanged {
                    count: mempool.tx_count,
                    bytes: mempool.bytes,
                });
            }
        }
        if let Some(traffic) = observation.traffic {
            if replace_if_changed(&mut last.traffic, traffic) {
                pending.push(ClientNotification::BytesChanged {
                    received: traffic.received,
                    sent: traffic.sent,
                });
            }
        }

        for notification in &pending {
            self.bus.emit(notification);
        }
        pending.len()
    }

    pub fn observe_num_connections(&self, count: usize) -> bool {
        let mut last = self.lock();
        self.emit_if(
            replace_if_changed(&mut last.num_connections, count),
            ClientNotification::NumConnectionsChanged(count),
        )
    }

    pub fn observe_network_active(&self, active: bool) -> bool {
        let mut last = self.lock();
        self.emit_if(
            replace_if_changed(&mut last.network_active, active),
            ClientNotification::NetworkActiveChanged(active),
        )
    }

    pub fn observe_alerts(&self, warnings: &str) -> bool {
        let mut last = self.lock();
        if last.alerts.as_deref() == Some(warnings) {
            return false;
        }
        last.alerts = Some(warnings.to_string());
        self.emit_if(true, ClientNotification::AlertsChanged(warnings.to_string()))
    }

    pub fn observe_header_progress(&self, current: u64, total: u64) -> bool {
        let mut last = self.lock();
        self.emit_if(
            replace_if_changed(&mut last.header_progress, (current, total)),
            ClientNotification::HeaderProgressChanged { current, total },
        )
    }

    pub fn observe_spv_progress(
        &self,
        start_height: u64,
        processed_height: u64,
        probable_height: u64,
    ) -> bool {
        let mut last = self.lock();
        self.emit_if(
            replace_if_changed(
                &mut last.spv_progress,
                (start_height, processed_height, probable_height),
            ),
            ClientNotification::SpvProgressChanged {
                start_height,
                processed_height,
                probable_height,
            },
        )
    }

    /// Announce a stateless event (message, wallet alert, ...) unconditionally.
    pub fn forward(&self, notification: ClientNotification) {
        let _last = self.lock();
        self.bus.emit(&notification);
    }

    /// Callers hold the snapshot lock across this call.
    fn emit_if(&self, changed: bool, notification: ClientNotification) -> bool {
        if changed {
            self.bus.emit(&notification);
        }
        changed
    }

    fn lock(&self) -> MutexGuard<'_, LastEmittedSnapshot> {
        self.last
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
