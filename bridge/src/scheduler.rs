//! Poll scheduler: runs the reconciliation job on a fixed interval.
//!
//! The timer task only decides whether to start a cycle; the cycle itself
//! runs on tokio's blocking pool, so a slow node query never stalls the
//! timer (or any other task on the runtime's worker threads).
//!
//! At most one cycle runs at a time. A tick that arrives while a cycle is in
//! flight is dropped and counted, never queued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::metrics::BridgeMetrics;
use crate::shutdown::ShutdownController;

/// The reconciliation routine driven by the scheduler.
pub type PollJob = Arc<dyn Fn() + Send + Sync>;

/// What happened to one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// A new cycle was started.
    Started,
    /// A cycle was already running; this tick was dropped.
    Skipped,
}

/// Clears the in-flight flag when the cycle ends, even if the job panics.
struct CycleGuard(Arc<AtomicBool>);

impl Drop for CycleGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct SchedulerShared {
    job: PollJob,
    in_flight: Arc<AtomicBool>,
    runtime: Handle,
    metrics: Arc<BridgeMetrics>,
}

impl SchedulerShared {
    fn try_begin(&self) -> Option<CycleGuard> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CycleGuard(Arc::clone(&self.in_flight)))
    }

    fn skipped(&self) -> TickOutcome {
        self.metrics.reconcile_skipped.inc();
        tracing::trace!("reconciliation still running, tick skipped");
        TickOutcome::Skipped
    }

    /// Start a cycle on the blocking pool.
    fn launch(&self) -> TickOutcome {
        let Some(guard) = self.try_begin() else {
            return self.skipped();
        };
        let job = Arc::clone(&self.job);
        self.runtime.spawn_blocking(move || {
            let _guard = guard;
            job();
        });
        TickOutcome::Started
    }

    /// Run a cycle on the calling thread.
    fn run_inline(&self) -> TickOutcome {
        let Some(_guard) = self.try_begin() else {
            return self.skipped();
        };
        (self.job)();
        TickOutcome::Started
    }
}

pub struct PollScheduler {
    shared: Arc<SchedulerShared>,
    interval: Duration,
    shutdown: ShutdownController,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PollScheduler {
    /// Create a stopped scheduler. `interval` must be non-zero.
    pub fn new(
        runtime: Handle,
        interval: Duration,
        job: PollJob,
        metrics: Arc<BridgeMetrics>,
    ) -> Self {
        Self {
            shared: Arc::new(SchedulerShared {
                job,
                in_flight: Arc::new(AtomicBool::new(false)),
                runtime,
                metrics,
            }),
            interval,
            shutdown: ShutdownController::new(),
            task: Mutex::new(None),
        }
    }

    /// Spawn the timer task. The first tick fires one interval from now.
    /// Calling this again while running, or after [`stop`](Self::stop), does nothing.
    pub fn start(&self) {
        let mut task = self.task.lock().unwrap_or_else(|p| p.into_inner());
        if task.is_some() || self.shutdown.is_shutdown() {
            return;
        }

        let shared = Arc::clone(&self.shared);
        let period = self.interval;
        let mut shutdown_rx = self.shutdown.subscribe();

        *task = Some(self.shared.runtime.spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            tracing::debug!(interval_ms = period.as_millis() as u64, "poll scheduler started");
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => {
                        tracing::debug!("poll scheduler shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        shared.launch();
                    }
                }
            }
        }));
    }

    /// Start a cycle now on the blocking pool, as a timer tick would.
    pub fn trigger(&self) -> TickOutcome {
        self.shared.launch()
    }

    /// Run a cycle now on the calling thread. Subject to the same
    /// one-cycle-at-a-time rule as timer ticks.
    pub fn run_now(&self) -> TickOutcome {
        self.shared.run_inline()
    }

    pub fn is_cycle_running(&self) -> bool {
        self.shared.in_flight.load(Ordering::Acquire)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Stop the timer. An in-flight cycle runs to completion.
    pub fn stop(&self) {
        self.shutdown.shutdown();
    }

    pub fn is_stopped(&self) -> bool {
        self.shutdown.is_shutdown()
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
