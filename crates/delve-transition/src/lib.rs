//! Room transition engine for Delve.
//!
//! Resolves navigation requests (doors, stairs, trapdoors, secret
//! passages) against the room graph and runs the fade-out, swap, fade-in
//! sequence that moves the player between rooms.
//!
//! # Key types
//!
//! - [`TransitionEngine`]: the state machine; one per game
//! - [`Presenter`]: contract for whoever draws the fade
//! - [`RoomBuilder`]: contract for whoever constructs room content
//! - [`RoomEvent`]: lifecycle notifications for decoupled consumers
//! - [`EngineConfig`] / [`SpawnTable`]: timings and arrival positions
//!
//! The engine implements [`delve_watchdog::TransitionMonitor`] so a
//! [`Watchdog`](delve_watchdog::Watchdog) can rescue a stuck transition.

mod builder;
mod config;
mod engine;
mod error;
mod presenter;
mod state;

pub use builder::RoomBuilder;
pub use config::{EngineConfig, SpawnTable};
pub use engine::{EventReceiver, RoomRegistrar, TransitionEngine};
pub use error::{BuildFault, NavigationError};
pub use presenter::Presenter;
pub use state::{EngineMetrics, EngineState, RoomEvent, TransitionOutcome, TransitionReport};

/// Spawn id used when loading the starting room.
pub const START_SPAWN_ID: &str = "start";

/// Prefix of the spawn id used when arriving through a secret passage;
/// the passage kind follows (`"secret_bookcase"`).
pub const SECRET_SPAWN_PREFIX: &str = "secret_";
