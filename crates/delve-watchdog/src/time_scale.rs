//! Shared game-speed control.
//!
//! Gameplay pause is modelled as a time scale of zero. The scale is a
//! clonable handle rather than a process global: whoever needs to pause
//! the game (menus, dialogue, hit-stop) gets a clone, and so does the
//! watchdog that rescues the game when a pause is never lifted.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::time::Instant;

#[derive(Debug)]
struct TimeScaleState {
    scale: f64,
    /// Set only by [`TimeScale::pause`]; a zero scale with this flag
    /// cleared is what the watchdog treats as a stall.
    intentionally_paused: bool,
    /// Scale to go back to on [`TimeScale::resume`].
    resume_to: f64,
    /// Real-time instant of the last scale change.
    changed_at: Instant,
}

/// Handle to the game's time scale. Cheap to clone; all clones share state.
#[derive(Debug, Clone)]
pub struct TimeScale {
    inner: Arc<Mutex<TimeScaleState>>,
}

impl TimeScale {
    /// Normal game speed.
    pub const NORMAL: f64 = 1.0;

    /// Creates a time scale running at normal speed.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(TimeScaleState {
                scale: Self::NORMAL,
                intentionally_paused: false,
                resume_to: Self::NORMAL,
                changed_at: Instant::now(),
            })),
        }
    }

    /// Current scale. `0.0` means frozen.
    pub fn scale(&self) -> f64 {
        self.lock().scale
    }

    /// Sets the scale directly (slow motion, hit-stop, ...). Negative
    /// values are clamped to zero.
    ///
    /// A non-zero scale also ends any intentional pause.
    pub fn set_scale(&self, scale: f64) {
        let mut state = self.lock();
        state.scale = scale.max(0.0);
        state.changed_at = Instant::now();
        if state.scale > 0.0 && state.intentionally_paused {
            state.intentionally_paused = false;
            tracing::debug!(scale = state.scale, "pause lifted by direct scale change");
        }
    }

    /// Freezes the game on purpose. The watchdog leaves this alone.
    pub fn pause(&self) {
        let mut state = self.lock();
        if state.intentionally_paused {
            return;
        }
        state.resume_to = if state.scale > 0.0 { state.scale } else { Self::NORMAL };
        state.scale = 0.0;
        state.intentionally_paused = true;
        state.changed_at = Instant::now();
        tracing::debug!(resume_to = state.resume_to, "game paused");
    }

    /// Lifts an intentional pause, restoring the scale in effect before it.
    pub fn resume(&self) {
        let mut state = self.lock();
        if !state.intentionally_paused {
            return;
        }
        state.scale = state.resume_to;
        state.intentionally_paused = false;
        state.changed_at = Instant::now();
        tracing::debug!(scale = state.scale, "game resumed");
    }

    pub fn is_intentionally_paused(&self) -> bool {
        self.lock().intentionally_paused
    }

    /// Real-time instant of the most recent change to the scale.
    pub fn changed_at(&self) -> Instant {
        self.lock().changed_at
    }

    fn lock(&self) -> MutexGuard<'_, TimeScaleState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for TimeScale {
    fn default() -> Self {
        Self::new()
    }
}
