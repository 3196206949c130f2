//! The `Presenter` contract: whoever draws the fade.
//!
//! The engine never renders anything. It asks the presenter to cover the
//! screen before swapping rooms and to uncover it afterwards, and those
//! two requests are the only points where a transition suspends.

use std::time::Duration;

/// Performs the visual fade between rooms.
///
/// `Send + Sync + 'static` because the engine shares the presenter with
/// the post-settle check task and the watchdog.
pub trait Presenter: Send + Sync + 'static {
    /// Fades to fully opaque over `duration`. Resolves when done.
    fn fade_out(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Fades back to fully clear over `duration`. Resolves when done.
    fn fade_in(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Current overlay opacity, `0.0` (clear) to `1.0` (opaque).
    fn current_opacity(&self) -> f32;

    /// Clears the overlay immediately, abandoning any fade in progress.
    fn force_clear(&self);
}
