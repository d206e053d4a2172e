//! The client bridge: one consumer's consistent, debounced view of a node.
//!
//! Two paths feed the [`ChangeEmitter`]:
//! - node events, handled synchronously on whichever node thread fired
//!   them (connections, network toggle, alerts, progress, messages);
//! - the poll cycle, driven by [`PollScheduler`], which re-queries block,
//!   header, mempool and traffic state, refreshes the [`HeaderCache`] and
//!   announces whatever changed.
//!
//! The two paths may interleave freely. The emitter's lock is the only
//! ordering point; the header cache has a single writer (the poll cycle).

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use chrono::{DateTime, Utc};
use tokio::runtime::Handle;

use chainview_node_api::{
    EventHandler, NodeApiError, NodeEventRegistry, NodeFacade, SubscriptionHandle,
};
use chainview_types::{AlertStatus, ConnectionDirection, NodeEvent, SyncSource, Timestamp};

use crate::alerts::AlertBook;
use crate::config::BridgeConfig;
use crate::emitter::{BlockTip, ChangeEmitter, MempoolStats, PollObservation, TrafficTotals};
use crate::header_cache::{HeaderCache, HeaderTip};
use crate::metrics::BridgeMetrics;
use crate::notification::{ClientNotification, NotificationBus};
use crate::scheduler::{PollJob, PollScheduler, TickOutcome};
use crate::BridgeError;

/// Version of this client, as reported by [`ClientBridge::format_full_version`].
pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

const STARTUP_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// A version is a release unless it carries a semver pre-release suffix.
fn is_release(version: &str) -> bool {
    !version.contains('-')
}

/// State reachable from node callbacks and the poll job.
struct BridgeShared {
    node: Arc<dyn NodeFacade>,
    cache: HeaderCache,
    emitter: ChangeEmitter,
    /// Lock order: `alerts`, then `warnings`, then the emitter's snapshot
    /// lock.
    alerts: Mutex<AlertBook>,
    /// Last aggregate built from `alerts`. Readers never touch `alerts`, so
    /// a notification listener may query it while an update is in flight.
    warnings: RwLock<String>,
    /// Cleared by `unsubscribe` so no new callback starts afterwards.
    listening: AtomicBool,
    metrics: Arc<BridgeMetrics>,
}

impl BridgeShared {
    /// Absorb a facade failure: count it, log it, and hand back `None`.
    fn query<T>(&self, what: &'static str, result: Result<T, NodeApiError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.metrics.facade_errors.inc();
                tracing::debug!(query = what, error = %e, "node query failed");
                None
            }
        }
    }

    fn lock_alerts(&self) -> MutexGuard<'_, AlertBook> {
        self.alerts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ── Poll path ───────────────────────────────────────────────────────

    fn fetch_header_tip(&self) -> Option<HeaderTip> {
        Some(HeaderTip {
            best_header_height: self.query("header_height", self.node.header_height())?,
            best_header_time: self.query("header_time", self.node.header_time())?,
            probable_height: self.query("probable_height", self.node.probable_height())?,
        })
    }

    fn fetch_block_tip(&self) -> Option<BlockTip> {
        Some(BlockTip {
            height: self.query("block_height", self.node.block_height())?,
            time: self.query("block_time", self.node.block_time())?,
        })
    }

    fn fetch_mempool(&self) -> Option<MempoolStats> {
        Some(MempoolStats {
            tx_count: self.query("mempool_tx_count", self.node.mempool_tx_count())?,
            bytes: self.query("mempool_bytes", self.node.mempool_bytes())?,
        })
    }

    fn fetch_traffic(&self) -> Option<TrafficTotals> {
        Some(TrafficTotals {
            received: self.query("bytes_received", self.node.bytes_received())?,
            sent: self.query("bytes_sent", self.node.bytes_sent())?,
        })
    }

    /// One reconciliation cycle. Never runs concurrently with itself.
    fn reconcile(&self) {
        let started = std::time::Instant::now();

        if let Some(tip) = self.fetch_header_tip() {
            self.cache.store(
                tip.best_header_height,
                tip.best_header_time,
                tip.probable_height,
            );
            self.metrics
                .header_tip_height
                .set(i64::try_from(tip.best_header_height).unwrap_or(i64::MAX));
        }

        let observation = PollObservation {
            block_tip: self.fetch_block_tip(),
            mempool: self.fetch_mempool(),
            traffic: self.fetch_traffic(),
        };
        let emitted = self.emitter.observe_poll(&observation);

        self.metrics.notifications_emitted.inc_by(emitted as u64);
        self.metrics.reconcile_cycles.inc();
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.metrics.reconcile_duration_ms.observe(elapsed_ms);
        tracing::trace!(emitted, elapsed_ms, "reconciliation cycle complete");
    }

    // ── Event path ──────────────────────────────────────────────────────

    fn handle_event(&self, event: &NodeEvent) {
        if !self.listening.load(Ordering::Acquire) {
            return;
        }
        self.metrics.node_events.inc();
        tracing::trace!(kind = event.kind(), "node event");

        let emitted = match event {
            NodeEvent::NumConnectionsChanged(count) => {
                self.emitter.observe_num_connections(*count)
            }
            NodeEvent::NetworkActiveChanged(active) => {
                self.emitter.observe_network_active(*active)
            }
            NodeEvent::AlertChanged { hash, status } => self.update_alert(hash, *status),
            NodeEvent::HeaderProgress { current, total } => {
                self.emitter.observe_header_progress(*current, *total)
            }
            NodeEvent::SpvProgress {
                start_height,
                processed_height,
                probable_height,
            } => self
                .emitter
                .observe_spv_progress(*start_height, *processed_height, *probable_height),
            NodeEvent::WalletAlert(message) => {
                self.emitter
                    .forward(ClientNotification::WalletAlert(message.clone()));
                true
            }
            NodeEvent::BanListChanged => {
                self.emitter.forward(ClientNotification::BanListChanged);
                true
            }
            NodeEvent::ShowProgress { title, percent } => {
                self.emitter.forward(ClientNotification::ShowProgress {
                    title: title.clone(),
                    percent: *percent,
                });
                true
            }
            NodeEvent::Message {
                title,
                message,
                style,
            } => {
                self.emitter.forward(ClientNotification::Message {
                    title: title.clone(),
                    message: message.clone(),
                    style: *style,
                });
                true
            }
        };

        if emitted {
            self.metrics.notifications_emitted.inc();
        }
    }

    /// Apply an alert transition and re-announce the aggregate text if it
    /// changed. If the node cannot supply the alert text, the book is left
    /// as it was.
    fn update_alert(&self, hash: &str, status: AlertStatus) -> bool {
        // Held across the text lookup so a concurrent expiry of the same
        // alert cannot land between the lookup and the insert.
        let mut alerts = self.lock_alerts();
        let message = if status.is_active() {
            match self.query("alert_message", self.node.alert_message(hash)) {
                Some(message) => message,
                None => return false,
            }
        } else {
            None
        };

        if alerts.apply(hash, status, message) {
            tracing::info!(%hash, ?status, active = alerts.len(), "alert changed");
        }
        let warnings = alerts.warnings();
        self.warnings
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone_from(&warnings);
        self.emitter.observe_alerts(&warnings)
    }
}

/// Builder for [`ClientBridge`]. Config, node facade and event registry
/// are required.
#[derive(Default)]
pub struct ClientBridgeBuilder {
    config: Option<Arc<BridgeConfig>>,
    node: Option<Arc<dyn NodeFacade>>,
    registry: Option<Arc<dyn NodeEventRegistry>>,
    notifications: Option<Arc<NotificationBus>>,
    runtime: Option<Handle>,
}

impl ClientBridgeBuilder {
    pub fn config(mut self, config: Arc<BridgeConfig>) -> Self {
        self.config = Some(config);
        self
    }

    pub fn node(mut self, node: Arc<dyn NodeFacade>) -> Self {
        self.node = Some(node);
        self
    }

    pub fn registry(mut self, registry: Arc<dyn NodeEventRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Share an existing bus. A fresh one is created otherwise.
    pub fn notifications(mut self, bus: Arc<NotificationBus>) -> Self {
        self.notifications = Some(bus);
        self
    }

    /// Runtime that drives the poll timer and blocking cycles. Defaults to
    /// the runtime `build` is called from.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Wire everything up, subscribe to node events and start polling.
    pub fn build(self) -> Result<ClientBridge, BridgeError> {
        let config = self
            .config
            .ok_or(BridgeError::MissingCollaborator("bridge config"))?;
        config.validate()?;
        let node = self
            .node
            .ok_or(BridgeError::MissingCollaborator("node facade"))?;
        let registry = self
            .registry
            .ok_or(BridgeError::MissingCollaborator("event registry"))?;
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().map_err(|_| BridgeError::NoRuntime)?,
        };
        let bus = self.notifications.unwrap_or_default();
        let metrics = Arc::new(BridgeMetrics::new());

        let shared = Arc::new(BridgeShared {
            node,
            cache: HeaderCache::new(),
            emitter: ChangeEmitter::new(bus),
            alerts: Mutex::new(AlertBook::new()),
            warnings: RwLock::new(String::new()),
            listening: AtomicBool::new(false),
            metrics: Arc::clone(&metrics),
        });

        let job: PollJob = {
            let shared = Arc::clone(&shared);
            Arc::new(move || shared.reconcile())
        };
        let scheduler = PollScheduler::new(runtime, config.poll_interval(), job, metrics);

        let bridge = ClientBridge {
            shared,
            registry,
            subscription: Mutex::new(None),
            scheduler,
            config,
            started_at: Utc::now(),
        };
        bridge.subscribe()?;
        bridge.scheduler.start();

        tracing::info!(
            client = %bridge.config.client_name,
            poll_interval_ms = bridge.config.poll_interval_ms,
            "client bridge started"
        );
        Ok(bridge)
    }
}

/// Observes a node on behalf of one consumer.
///
/// All query methods are non-blocking with respect to the bridge's own
/// state and safe from any thread. Live queries go straight to the facade
/// and return a zero/false/empty sentinel if it fails.
pub struct ClientBridge {
    shared: Arc<BridgeShared>,
    registry: Arc<dyn NodeEventRegistry>,
    subscription: Mutex<Option<SubscriptionHandle>>,
    scheduler: PollScheduler,
    config: Arc<BridgeConfig>,
    started_at: DateTime<Utc>,
}

impl ClientBridge {
    pub fn builder() -> ClientBridgeBuilder {
        ClientBridgeBuilder::default()
    }

    fn lock_subscription(&self) -> MutexGuard<'_, Option<SubscriptionHandle>> {
        self.subscription
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ── Subscription lifecycle ──────────────────────────────────────────

    /// Register for node events. Returns `Ok(false)` without registering
    /// again if a subscription is already held.
    pub fn subscribe(&self) -> Result<bool, BridgeError> {
        let mut slot = self.lock_subscription();
        if slot.is_some() {
            tracing::debug!("already subscribed to node events");
            return Ok(false);
        }

        let shared = Arc::clone(&self.shared);
        let handler: EventHandler =
            Arc::new(move |event: &NodeEvent| shared.handle_event(event));

        self.shared.listening.store(true, Ordering::Release);
        match self.registry.subscribe(handler) {
            Ok(handle) => {
                tracing::debug!(id = handle.id(), "subscribed to node events");
                *slot = Some(handle);
                Ok(true)
            }
            Err(e) => {
                self.shared.listening.store(false, Ordering::Release);
                Err(BridgeError::Subscribe(e))
            }
        }
    }

    /// Stop receiving node events. Safe to call any number of times.
    ///
    /// Once this returns no new callback starts; one already running may
    /// still finish.
    pub fn unsubscribe(&self) {
        let mut slot = self.lock_subscription();
        self.shared.listening.store(false, Ordering::Release);
        if let Some(handle) = slot.take() {
            tracing::debug!(id = handle.id(), "unsubscribing from node events");
            self.registry.unsubscribe(handle);
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.lock_subscription().is_some()
    }

    /// Unsubscribe and stop the poll timer. Also done on drop.
    pub fn shutdown(&self) {
        self.unsubscribe();
        self.scheduler.stop();
        tracing::info!("client bridge stopped");
    }

    // ── Reconciliation ──────────────────────────────────────────────────

    /// Run one reconciliation cycle on the calling thread, unless one is
    /// already running.
    pub fn reconcile_now(&self) -> TickOutcome {
        self.scheduler.run_now()
    }

    /// Start a reconciliation cycle in the background, as a timer tick would.
    pub fn request_refresh(&self) -> TickOutcome {
        self.scheduler.trigger()
    }

    pub fn is_reconciling(&self) -> bool {
        self.scheduler.is_cycle_running()
    }

    // ── Queries ─────────────────────────────────────────────────────────

    /// Live connection count for `filter`; 0 if the node is unreachable.
    pub fn num_connections(&self, filter: ConnectionDirection) -> usize {
        self.shared
            .query("connection_count", self.shared.node.connection_count(filter))
            .unwrap_or(0)
    }

    /// Live count of inbound plus outbound connections.
    pub fn num_connections_all(&self) -> usize {
        self.num_connections(ConnectionDirection::All)
    }

    /// Live active-chain height.
    pub fn num_blocks(&self) -> u64 {
        self.shared
            .query("block_height", self.shared.node.block_height())
            .unwrap_or(0)
    }

    /// Cached best header height.
    pub fn header_tip_height(&self) -> u64 {
        self.shared.cache.best_header_height()
    }

    /// Cached best header time.
    pub fn header_tip_time(&self) -> Timestamp {
        self.shared.cache.best_header_time()
    }

    /// Cached probable network height.
    pub fn probable_height(&self) -> u64 {
        self.shared.cache.probable_height()
    }

    /// All cached header fields. Not a consistent snapshot across fields.
    pub fn header_tip(&self) -> HeaderTip {
        self.shared.cache.load()
    }

    pub fn mempool_size(&self) -> u64 {
        self.shared
            .query("mempool_tx_count", self.shared.node.mempool_tx_count())
            .unwrap_or(0)
    }

    pub fn mempool_dynamic_usage(&self) -> u64 {
        self.shared
            .query("mempool_bytes", self.shared.node.mempool_bytes())
            .unwrap_or(0)
    }

    pub fn total_bytes_received(&self) -> u64 {
        self.shared
            .query("bytes_received", self.shared.node.bytes_received())
            .unwrap_or(0)
    }

    pub fn total_bytes_sent(&self) -> u64 {
        self.shared
            .query("bytes_sent", self.shared.node.bytes_sent())
            .unwrap_or(0)
    }

    /// Timestamp of the active chain tip; the epoch if unknown.
    pub fn last_block_timestamp(&self) -> Timestamp {
        self.shared
            .query("block_time", self.shared.node.block_time())
            .unwrap_or(Timestamp::EPOCH)
    }

    pub fn is_initial_sync(&self) -> bool {
        self.shared
            .query(
                "initial_block_download",
                self.shared.node.is_initial_block_download(),
            )
            .unwrap_or(false)
    }

    pub fn sync_source(&self) -> SyncSource {
        self.shared
            .query("block_source", self.shared.node.block_source())
            .unwrap_or(SyncSource::None)
    }

    pub fn network_active(&self) -> bool {
        self.shared
            .query("network_active", self.shared.node.is_network_active())
            .unwrap_or(false)
    }

    /// Ask the node to switch networking on or off. The change is announced
    /// when the node reports it back as an event, not here.
    pub fn set_network_active(&self, active: bool) {
        match self.shared.node.set_network_active(active) {
            Ok(()) => tracing::info!(active, "requested network activity change"),
            Err(e) => {
                self.shared.metrics.facade_errors.inc();
                tracing::warn!(active, error = %e, "failed to change network activity");
            }
        }
    }

    /// Status-bar text for every active alert, empty if none.
    pub fn status_warnings(&self) -> String {
        self.shared
            .warnings
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    // ── Client info ─────────────────────────────────────────────────────

    pub fn format_full_version(&self) -> String {
        format!("v{CLIENT_VERSION}")
    }

    /// User agent in the `/name:version/` form.
    pub fn format_sub_version(&self) -> String {
        format!("/{}:{}/", self.config.client_name, CLIENT_VERSION)
    }

    pub fn is_release_version(&self) -> bool {
        is_release(CLIENT_VERSION)
    }

    pub fn client_startup_time(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn format_client_startup_time(&self) -> String {
        self.started_at.format(STARTUP_TIME_FORMAT).to_string()
    }

    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    pub fn log_file(&self) -> PathBuf {
        self.config.log_file()
    }

    pub fn config(&self) -> &Arc<BridgeConfig> {
        &self.config
    }

    pub fn metrics(&self) -> &BridgeMetrics {
        &self.shared.metrics
    }

    pub fn notifications(&self) -> &Arc<NotificationBus> {
        self.shared.emitter.bus()
    }
}

impl Drop for ClientBridge {
    fn drop(&mut self) {
        self.unsubscribe();
        self.scheduler.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pre_release_versions_are_not_releases() {
        assert!(is_release("1.4.0"));
        assert!(!is_release("1.4.0-rc.1"));
    }

    #[test]
    fn startup_time_format() {
        let t = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        assert_eq!(
            t.format(STARTUP_TIME_FORMAT).to_string(),
            "2023-11-14 22:13:20 UTC"
        );
    }
}
