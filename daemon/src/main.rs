//! chainview monitor: attaches a client bridge to a node and logs every
//! change notification it produces.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chainview_bridge::{
    BridgeConfig, ClientBridge, ClientNotification, NotificationBus, ShutdownController,
};
use chainview_nullables::{NullEventRegistry, NullNode};
use chainview_types::{NodeEvent, SyncSource, Timestamp};
use chainview_utils::{format_duration, init_logging, LogFormat};
use clap::Parser;
use tokio::time::Instant;

#[derive(Parser)]
#[command(name = "chainview-monitor", about = "Watch a node through a chainview client bridge")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "CHAINVIEW_CONFIG")]
    config: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "CHAINVIEW_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "CHAINVIEW_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Milliseconds between reconciliation cycles.
    #[arg(long, env = "CHAINVIEW_POLL_INTERVAL_MS")]
    poll_interval_ms: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run the bridge against an in-memory node that mines blocks on a timer.
    Simulate {
        /// Seconds between simulated blocks.
        #[arg(long, default_value_t = 5)]
        block_interval_secs: u64,

        /// Number of simulated peers.
        #[arg(long, default_value_t = 8)]
        peers: usize,
    },
}

/// Read the config file, falling back to defaults if it is missing or bad,
/// then apply CLI overrides.
fn load_config(cli: &Cli) -> anyhow::Result<BridgeConfig> {
    let mut config = match cli.config {
        Some(ref path) => match BridgeConfig::from_toml_file(&path.to_string_lossy()) {
            Ok(config) => config,
            Err(e) => {
                eprintln!(
                    "failed to load config file {}: {e}, using defaults",
                    path.display()
                );
                BridgeConfig::default()
            }
        },
        None => BridgeConfig::default(),
    };

    if let Some(ref level) = cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    if let Some(interval) = cli.poll_interval_ms {
        config.poll_interval_ms = interval;
    }
    config.validate()?;
    Ok(config)
}

/// Deterministic chain activity fed into the null node.
struct SimulatedChain {
    height: u64,
    bytes_received: u64,
    bytes_sent: u64,
    base_peers: usize,
    peers: usize,
}

impl SimulatedChain {
    fn new(peers: usize) -> Self {
        Self {
            height: 0,
            bytes_received: 0,
            bytes_sent: 0,
            base_peers: peers,
            peers,
        }
    }

    /// Mine one block. Returns the new peer count if it moved.
    fn advance(&mut self, node: &NullNode, now: Timestamp) -> Option<usize> {
        self.height += 1;
        self.bytes_received += 4_096 + self.height * 17;
        self.bytes_sent += 1_024 + self.height * 5;

        let tx_count = (self.height * 7) % 50;
        node.set_block_tip(self.height, now);
        node.set_probable_height(self.height);
        node.set_mempool(tx_count, tx_count * 250);
        node.set_traffic(self.bytes_received, self.bytes_sent);

        // One peer drops every third block and reconnects on the next.
        let peers = if self.height % 3 == 0 && self.base_peers > 0 {
            self.base_peers - 1
        } else {
            self.base_peers
        };
        if peers == self.peers {
            return None;
        }
        self.peers = peers;
        node.set_connections(peers / 2, peers - peers / 2);
        Some(peers)
    }
}

fn log_notification(notification: &ClientNotification) {
    match serde_json::to_string(notification) {
        Ok(payload) => tracing::info!(kind = notification.kind(), %payload, "notification"),
        Err(e) => {
            tracing::warn!(kind = notification.kind(), error = %e, "unserializable notification")
        }
    }
}

async fn simulate(
    config: BridgeConfig,
    block_interval: Duration,
    peers: usize,
) -> anyhow::Result<()> {
    let node = Arc::new(NullNode::new());
    node.update(|s| {
        s.initial_block_download = false;
        s.block_source = SyncSource::Network;
    });
    node.set_connections(peers / 2, peers - peers / 2);

    let registry = Arc::new(NullEventRegistry::new());
    let bus = Arc::new(NotificationBus::new());
    let mut notifications = bus.subscribe_channel();

    let bridge = ClientBridge::builder()
        .config(Arc::new(config))
        .node(node.clone())
        .registry(registry.clone())
        .notifications(bus)
        .build()?;

    tracing::info!(
        version = %bridge.format_full_version(),
        agent = %bridge.format_sub_version(),
        release = bridge.is_release_version(),
        started = %bridge.format_client_startup_time(),
        data_dir = %bridge.data_dir().display(),
        log_file = %bridge.log_file().display(),
        "chainview monitor running"
    );
    registry.fire(&NodeEvent::NumConnectionsChanged(peers));

    let shutdown = Arc::new(ShutdownController::new());
    let mut shutdown_rx = shutdown.subscribe();
    let signals = {
        let shutdown = Arc::clone(&shutdown);
        tokio::spawn(async move { shutdown.wait_for_signal().await })
    };

    let mut chain = SimulatedChain::new(peers);
    let started = Instant::now();
    let mut blocks = tokio::time::interval_at(started + block_interval, block_interval);

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = blocks.tick() => {
                if let Some(peers) = chain.advance(&node, Timestamp::now()) {
                    registry.fire(&NodeEvent::NumConnectionsChanged(peers));
                }
                tracing::debug!(height = chain.height, "simulated block");
            }
            Some(notification) = notifications.recv() => log_notification(&notification),
        }
    }

    signals.abort();
    bridge.shutdown();
    while let Ok(notification) = notifications.try_recv() {
        log_notification(&notification);
    }

    tracing::debug!(exposition = %bridge.metrics().encode(), "bridge metrics");
    tracing::info!(
        uptime = %format_duration(started.elapsed().as_secs()),
        blocks = chain.height,
        cycles = bridge.metrics().reconcile_cycles.get(),
        notifications = bridge.metrics().notifications_emitted.get(),
        "chainview monitor exited cleanly"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(config.log_format, &config.log_level);

    if let Some(ref path) = cli.config {
        tracing::info!(path = %path.display(), "config file processed");
    }

    match cli.command {
        Command::Simulate {
            block_interval_secs,
            peers,
        } => {
            let block_interval = Duration::from_secs(block_interval_secs.max(1));
            simulate(config, block_interval, peers).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainview_node_api::NodeFacade;

    #[test]
    fn simulated_chain_moves_the_node_forward() {
        let node = NullNode::new();
        let mut chain = SimulatedChain::new(8);

        assert_eq!(chain.advance(&node, Timestamp::new(10)), None);
        assert_eq!(chain.advance(&node, Timestamp::new(20)), None);
        assert_eq!(chain.advance(&node, Timestamp::new(30)), Some(7));
        assert_eq!(chain.advance(&node, Timestamp::new(40)), Some(8));

        assert_eq!(node.block_height(), Ok(4));
        assert_eq!(node.block_time(), Ok(Timestamp::new(40)));
        assert_eq!(node.header_height(), Ok(4));
        assert_eq!(node.mempool_tx_count(), Ok(28));
    }

    #[test]
    fn no_peers_never_changes_connections() {
        let node = NullNode::new();
        let mut chain = SimulatedChain::new(0);
        for t in 0..6 {
            assert_eq!(chain.advance(&node, Timestamp::new(t)), None);
        }
    }

    #[test]
    fn cli_overrides_config_defaults() {
        let cli = Cli::parse_from([
            "chainview-monitor",
            "--log-level",
            "debug",
            "--log-format",
            "json",
            "--poll-interval-ms",
            "500",
            "simulate",
        ]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.poll_interval_ms, 500);
    }

    #[test]
    fn out_of_range_poll_interval_is_rejected() {
        let cli = Cli::parse_from(["chainview-monitor", "--poll-interval-ms", "0", "simulate"]);
        assert!(load_config(&cli).is_err());
    }
}
