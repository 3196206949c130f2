//! Integration tests for the stall watchdog.
//!
//! Uses `start_paused = true` so the real-time clock only moves when
//! the test advances it (or when every task is idle and Tokio
//! auto-advances to the next timer).

use std::sync::{Arc, Mutex};
use std::time::Duration;

use delve_watchdog::{Recovery, TimeScale, TransitionMonitor, Watchdog, WatchdogConfig};
use tokio::time::{self, Instant};

// =========================================================================
// Fake monitor
// =========================================================================

#[derive(Clone, Default)]
struct FakeEngine {
    busy_since: Arc<Mutex<Option<Instant>>>,
    settles: Arc<Mutex<u32>>,
}

impl FakeEngine {
    fn start_transition(&self) {
        *self.busy_since.lock().unwrap() = Some(Instant::now());
    }

    fn finish_transition(&self) {
        *self.busy_since.lock().unwrap() = None;
    }

    fn settles(&self) -> u32 {
        *self.settles.lock().unwrap()
    }
}

impl TransitionMonitor for FakeEngine {
    fn busy_since(&self) -> Option<Instant> {
        *self.busy_since.lock().unwrap()
    }

    fn force_settle(&self) {
        *self.busy_since.lock().unwrap() = None;
        *self.settles.lock().unwrap() += 1;
    }
}

fn watchdog(engine: &FakeEngine, time_scale: &TimeScale) -> Watchdog<FakeEngine> {
    Watchdog::new(WatchdogConfig::default(), engine.clone(), time_scale.clone())
}

// =========================================================================
// Stuck transition
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_busy_held_past_timeout_is_forced_to_settle() {
    let engine = FakeEngine::default();
    let time_scale = TimeScale::new();
    let mut wd = watchdog(&engine, &time_scale);

    engine.start_transition();
    time::advance(Duration::from_secs(4)).await;
    assert!(wd.check().is_empty(), "4s is within the 5s budget");
    assert!(engine.busy_since().is_some());

    time::advance(Duration::from_secs(2)).await;
    let recoveries = wd.check();
    assert_eq!(recoveries.len(), 1);
    match recoveries[0] {
        Recovery::TransitionSettled { held_for } => assert!(held_for >= Duration::from_secs(6)),
        other => panic!("unexpected recovery {other:?}"),
    }
    assert!(engine.busy_since().is_none());
    assert_eq!(engine.settles(), 1);
    assert_eq!(wd.metrics().transitions_settled, 1);
}

#[tokio::test(start_paused = true)]
async fn test_short_transitions_are_left_alone() {
    let engine = FakeEngine::default();
    let time_scale = TimeScale::new();
    let mut wd = watchdog(&engine, &time_scale);

    for _ in 0..3 {
        engine.start_transition();
        time::advance(Duration::from_secs(1)).await;
        assert!(wd.check().is_empty());
        engine.finish_transition();
    }
    assert_eq!(engine.settles(), 0);
    assert_eq!(wd.metrics().checks, 3);
}

// =========================================================================
// Stuck pause
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_frozen_time_scale_is_restored() {
    let engine = FakeEngine::default();
    let time_scale = TimeScale::new();
    let mut wd = watchdog(&engine, &time_scale);

    time_scale.set_scale(0.0);
    time::advance(Duration::from_millis(400)).await;
    assert!(wd.check().is_empty());
    assert_eq!(time_scale.scale(), 0.0);

    time::advance(Duration::from_millis(200)).await;
    let recoveries = wd.check();
    assert!(matches!(recoveries[..], [Recovery::TimeScaleRestored { .. }]));
    assert_eq!(time_scale.scale(), 1.0);
    assert_eq!(wd.metrics().time_scale_restores, 1);
}

#[tokio::test(start_paused = true)]
async fn test_intentional_pause_is_respected() {
    let engine = FakeEngine::default();
    let time_scale = TimeScale::new();
    let mut wd = watchdog(&engine, &time_scale);

    time_scale.pause();
    time::advance(Duration::from_secs(30)).await;
    assert!(wd.check().is_empty());
    assert_eq!(time_scale.scale(), 0.0);
    assert!(time_scale.is_intentionally_paused());
}

#[tokio::test(start_paused = true)]
async fn test_repeated_zero_writes_do_not_restart_the_stall() {
    let engine = FakeEngine::default();
    let time_scale = TimeScale::new();
    let mut wd = watchdog(&engine, &time_scale);

    // A broken system writing zero every frame.
    time_scale.set_scale(0.0);
    let mut restored = false;
    for _ in 0..60 {
        time::advance(Duration::from_millis(16)).await;
        time_scale.set_scale(0.0);
        if !wd.check().is_empty() {
            restored = true;
            break;
        }
    }

    assert!(restored, "frozen for ~1s without a restore");
    assert_eq!(time_scale.scale(), 1.0);
    assert_eq!(wd.metrics().time_scale_restores, 1);
}

#[tokio::test(start_paused = true)]
async fn test_freeze_after_unfrozen_gap_starts_a_new_stall() {
    let engine = FakeEngine::default();
    let time_scale = TimeScale::new();
    let mut wd = watchdog(&engine, &time_scale);

    time_scale.set_scale(0.0);
    time::advance(Duration::from_millis(400)).await;
    assert!(wd.check().is_empty());

    time_scale.set_scale(1.0);
    assert!(wd.check().is_empty());

    time_scale.set_scale(0.0);
    time::advance(Duration::from_millis(400)).await;
    assert!(wd.check().is_empty(), "the earlier 400ms must not count");
    assert_eq!(time_scale.scale(), 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_freeze_after_pause_lifted_by_set_scale_is_restored() {
    let engine = FakeEngine::default();
    let time_scale = TimeScale::new();
    let mut wd = watchdog(&engine, &time_scale);

    time_scale.pause();
    time_scale.set_scale(1.0);
    time_scale.set_scale(0.0);
    time::advance(Duration::from_secs(3)).await;

    assert_eq!(wd.check().len(), 1);
    assert_eq!(time_scale.scale(), 1.0);
    assert!(!time_scale.is_intentionally_paused());
}

#[tokio::test(start_paused = true)]
async fn test_near_zero_scale_counts_as_frozen() {
    let engine = FakeEngine::default();
    let time_scale = TimeScale::new();
    let mut wd = watchdog(&engine, &time_scale);

    time_scale.set_scale(1e-6);
    time::advance(Duration::from_secs(1)).await;
    assert_eq!(wd.check().len(), 1);
    assert_eq!(time_scale.scale(), 1.0);
}

#[tokio::test(start_paused = true)]
async fn test_slow_motion_is_not_a_stall() {
    let engine = FakeEngine::default();
    let time_scale = TimeScale::new();
    let mut wd = watchdog(&engine, &time_scale);

    time_scale.set_scale(0.25);
    time::advance(Duration::from_secs(10)).await;
    assert!(wd.check().is_empty());
    assert_eq!(time_scale.scale(), 0.25);
}

// =========================================================================
// Spawned loop
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_spawned_watchdog_recovers_and_reports_metrics() {
    let engine = FakeEngine::default();
    let time_scale = TimeScale::new();
    let handle = watchdog(&engine, &time_scale).spawn();

    engine.start_transition();
    time_scale.set_scale(0.0);

    // Busy for 6s against a 5s threshold.
    time::sleep(Duration::from_secs(6)).await;

    assert!(engine.busy_since().is_none(), "watchdog should have settled the engine");
    assert_eq!(time_scale.scale(), 1.0);

    let metrics = handle.shutdown().await.unwrap();
    assert_eq!(metrics.transitions_settled, 1);
    assert_eq!(metrics.time_scale_restores, 1);
    assert!(metrics.checks > 100);
}
