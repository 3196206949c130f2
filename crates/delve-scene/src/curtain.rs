//! `FadeCurtain`: a full-screen overlay whose opacity ramps over time.
//!
//! The curtain only tracks a number between 0 and 1; whatever renders the
//! game reads [`FadeCurtain::opacity`] each frame and draws accordingly.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use delve_transition::Presenter;
use serde::{Deserialize, Serialize};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, trace};

/// Settings for the curtain's ramp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurtainConfig {
    /// Opacity updates per second while a fade runs.
    pub steps_per_second: u32,
}

impl Default for CurtainConfig {
    fn default() -> Self {
        Self {
            steps_per_second: 60,
        }
    }
}

impl CurtainConfig {
    pub const MAX_STEPS_PER_SECOND: u32 = 240;

    pub fn validated(mut self) -> Self {
        self.steps_per_second = self.steps_per_second.clamp(1, Self::MAX_STEPS_PER_SECOND);
        self
    }

    fn step(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.steps_per_second as f64)
    }
}

#[derive(Debug)]
struct CurtainState {
    opacity: f32,
    /// Bumped whenever a new fade starts or the curtain is cleared/halted.
    /// A ramp stops as soon as it sees a generation other than its own.
    generation: u64,
}

/// Reference [`Presenter`] that ramps opacity linearly.
#[derive(Debug)]
pub struct FadeCurtain {
    config: CurtainConfig,
    state: Mutex<CurtainState>,
}

impl FadeCurtain {
    pub fn new(config: CurtainConfig) -> Self {
        Self {
            config: config.validated(),
            state: Mutex::new(CurtainState {
                opacity: 0.0,
                generation: 0,
            }),
        }
    }

    pub fn opacity(&self) -> f32 {
        self.lock().opacity
    }

    /// Stops any running fade at its current opacity without clearing it,
    /// which is what an unrelated fault elsewhere tends to do to a fade.
    pub fn halt(&self) {
        let mut state = self.lock();
        state.generation += 1;
        debug!(opacity = state.opacity, "curtain halted");
    }

    async fn ramp(&self, target: f32, duration: Duration) {
        let (from, generation) = {
            let mut state = self.lock();
            state.generation += 1;
            (state.opacity, state.generation)
        };

        if duration.is_zero() {
            self.apply(generation, target);
            return;
        }

        let started = Instant::now();
        let mut interval = time::interval(self.config.step());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            let progress = (started.elapsed().as_secs_f32() / duration.as_secs_f32()).min(1.0);
            if !self.apply(generation, from + (target - from) * progress) {
                trace!(target, "fade superseded");
                return;
            }
            if progress >= 1.0 {
                return;
            }
        }
    }

    /// Writes `opacity` if `generation` is still current.
    fn apply(&self, generation: u64, opacity: f32) -> bool {
        let mut state = self.lock();
        if state.generation != generation {
            return false;
        }
        state.opacity = opacity.clamp(0.0, 1.0);
        true
    }

    fn lock(&self) -> MutexGuard<'_, CurtainState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for FadeCurtain {
    fn default() -> Self {
        Self::new(CurtainConfig::default())
    }
}

impl Presenter for FadeCurtain {
    async fn fade_out(&self, duration: Duration) {
        self.ramp(1.0, duration).await;
    }

    async fn fade_in(&self, duration: Duration) {
        self.ramp(0.0, duration).await;
    }

    fn current_opacity(&self) -> f32 {
        self.opacity()
    }

    fn force_clear(&self) {
        let mut state = self.lock();
        state.generation += 1;
        state.opacity = 0.0;
        debug!("curtain force-cleared");
    }
}
