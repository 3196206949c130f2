//! Stall watchdog for Delve.
//!
//! A last-resort safety net that runs beside the transition engine and
//! fixes two kinds of stuck state:
//!
//! 1. **Stuck transition**: the engine has reported itself busy for
//!    longer than [`WatchdogConfig::busy_timeout`]. The watchdog forces it
//!    to settle through [`TransitionMonitor::force_settle`].
//! 2. **Stuck pause**: the [`TimeScale`] sits at (effectively) zero for
//!    longer than [`WatchdogConfig::stall_timeout`] without anyone having
//!    paused the game on purpose. The watchdog restores normal speed.
//!
//! Either recovery means something upstream is broken, so both are
//! logged at error level.
//!
//! All timing uses Tokio's real-time clock, never the game time scale:
//! a frozen game must not be able to freeze the thing that unfreezes it.
//!
//! # Integration
//!
//! ```ignore
//! let watchdog = Watchdog::new(WatchdogConfig::default(), engine.clone(), time_scale.clone());
//! let handle = watchdog.spawn();
//! // ...
//! let metrics = handle.shutdown().await;
//! ```

mod time_scale;

pub use time_scale::TimeScale;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, warn};

// ---------------------------------------------------------------------------
// Monitored component
// ---------------------------------------------------------------------------

/// Something with a busy flag the watchdog is allowed to reset.
///
/// The transition engine implements this. The watchdog is the only
/// party other than the engine itself that may write engine state, and
/// only through [`force_settle`](Self::force_settle).
pub trait TransitionMonitor: Send + Sync + 'static {
    /// Real-time instant the current transition started, or `None` when idle.
    fn busy_since(&self) -> Option<Instant>;

    /// Clears the busy flag and any leftover fade, whatever state the
    /// in-flight transition is in.
    fn force_settle(&self);
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Watchdog thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchdogConfig {
    /// How often [`Watchdog::check`] runs when spawned.
    pub check_interval: Duration,
    /// Longest a transition may hold the busy flag.
    pub busy_timeout: Duration,
    /// Longest the time scale may sit at zero without an intentional pause.
    pub stall_timeout: Duration,
    /// Scales at or below this count as frozen.
    pub zero_epsilon: f64,
    /// Scale written back when a stuck pause is recovered.
    pub restore_scale: f64,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_millis(16),
            busy_timeout: Duration::from_secs(5),
            stall_timeout: Duration::from_millis(500),
            zero_epsilon: 1e-4,
            restore_scale: TimeScale::NORMAL,
        }
    }
}

impl WatchdogConfig {
    /// Shortest allowed check interval. `tokio::time::interval` rejects zero.
    pub const MIN_CHECK_INTERVAL: Duration = Duration::from_millis(1);

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`Watchdog::new`].
    pub fn validated(mut self) -> Self {
        if self.check_interval < Self::MIN_CHECK_INTERVAL {
            warn!(
                interval_ms = self.check_interval.as_secs_f64() * 1000.0,
                "watchdog check interval too small, clamping"
            );
            self.check_interval = Self::MIN_CHECK_INTERVAL;
        }
        self.zero_epsilon = self.zero_epsilon.max(0.0);
        if self.restore_scale <= self.zero_epsilon {
            warn!(
                restore_scale = self.restore_scale,
                "restore scale would still count as frozen, using normal speed"
            );
            self.restore_scale = TimeScale::NORMAL;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Recoveries and metrics
// ---------------------------------------------------------------------------

/// A recovery performed by one [`Watchdog::check`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Recovery {
    /// A transition held the busy flag for `held_for` and was force-settled.
    TransitionSettled { held_for: Duration },
    /// The time scale was frozen for `stalled_for` and was restored.
    TimeScaleRestored { stalled_for: Duration },
}

/// Counters for watchdog activity. Non-zero recovery counts mean bugs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchdogMetrics {
    pub checks: u64,
    pub transitions_settled: u64,
    pub time_scale_restores: u64,
}

// ---------------------------------------------------------------------------
// Watchdog
// ---------------------------------------------------------------------------

/// Periodic monitor for a [`TransitionMonitor`] and a [`TimeScale`].
pub struct Watchdog<M: TransitionMonitor> {
    config: WatchdogConfig,
    monitor: M,
    time_scale: TimeScale,
    metrics: WatchdogMetrics,
    /// When the current unintended freeze began. Held here rather than
    /// read from the time scale each check, so repeated zero writes do
    /// not restart the stall clock.
    frozen_since: Option<Instant>,
}

impl<M: TransitionMonitor> Watchdog<M> {
    pub fn new(config: WatchdogConfig, monitor: M, time_scale: TimeScale) -> Self {
        let config = config.validated();
        debug!(
            busy_timeout_ms = config.busy_timeout.as_millis() as u64,
            stall_timeout_ms = config.stall_timeout.as_millis() as u64,
            "watchdog created"
        );
        Self {
            config,
            monitor,
            time_scale,
            metrics: WatchdogMetrics::default(),
            frozen_since: None,
        }
    }

    /// Runs one round of checks and performs any recoveries that are due.
    pub fn check(&mut self) -> Vec<Recovery> {
        let now = Instant::now();
        let mut recoveries = Vec::new();
        self.metrics.checks += 1;

        if let Some(since) = self.monitor.busy_since() {
            let held_for = now.saturating_duration_since(since);
            if held_for > self.config.busy_timeout {
                error!(
                    held_ms = held_for.as_millis() as u64,
                    timeout_ms = self.config.busy_timeout.as_millis() as u64,
                    "transition stuck busy, forcing it to settle"
                );
                self.monitor.force_settle();
                self.metrics.transitions_settled += 1;
                recoveries.push(Recovery::TransitionSettled { held_for });
            }
        }

        let scale = self.time_scale.scale();
        if scale > self.config.zero_epsilon || self.time_scale.is_intentionally_paused() {
            self.frozen_since = None;
        } else {
            let since = *self
                .frozen_since
                .get_or_insert_with(|| self.time_scale.changed_at());
            let stalled_for = now.saturating_duration_since(since);
            if stalled_for > self.config.stall_timeout {
                error!(
                    scale,
                    stalled_ms = stalled_for.as_millis() as u64,
                    restore_to = self.config.restore_scale,
                    "time scale frozen without a pause, restoring"
                );
                self.time_scale.set_scale(self.config.restore_scale);
                self.frozen_since = None;
                self.metrics.time_scale_restores += 1;
                recoveries.push(Recovery::TimeScaleRestored { stalled_for });
            }
        }

        recoveries
    }

    pub fn metrics(&self) -> &WatchdogMetrics {
        &self.metrics
    }

    pub fn config(&self) -> &WatchdogConfig {
        &self.config
    }

    /// Moves the watchdog onto its own task, checking every
    /// `check_interval` until the returned handle is shut down.
    pub fn spawn(self) -> WatchdogHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(self.run(shutdown_rx));
        WatchdogHandle {
            shutdown: shutdown_tx,
            task,
        }
    }

    async fn run(mut self, mut shutdown: oneshot::Receiver<()>) -> WatchdogMetrics {
        let mut interval = time::interval(self.config.check_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        debug!("watchdog started");

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = interval.tick() => {
                    self.check();
                }
            }
        }

        debug!(checks = self.metrics.checks, "watchdog stopped");
        self.metrics
    }
}

/// Handle to a spawned watchdog task.
pub struct WatchdogHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<WatchdogMetrics>,
}

impl WatchdogHandle {
    /// Stops the watchdog and returns its final metrics.
    ///
    /// Returns `None` if the task already ended abnormally.
    pub async fn shutdown(self) -> Option<WatchdogMetrics> {
        let _ = self.shutdown.send(());
        self.task.await.ok()
    }
}
