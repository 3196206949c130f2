//! # Delve
//!
//! Room-graph navigation and transition engine for dungeon crawlers.
//!
//! Rooms and their connections (doors, stairs, trapdoors, secret
//! passages) live in a [`RoomGraph`](delve_graph::RoomGraph). The
//! [`TransitionEngine`](delve_transition::TransitionEngine) moves the
//! player between them behind a fade, rebuilding room content in the
//! middle, and a [`Watchdog`](delve_watchdog::Watchdog) rescues it if
//! anything gets stuck.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use delve::prelude::*;
//!
//! # async fn run() -> Result<(), DelveError> {
//! let dungeon = Dungeon::builder()
//!     .room(RoomDefinition::new("A", "Entrance").with_door(Direction::East, Edge::to("B")))
//!     .room(RoomDefinition::new("B", "Corridor").with_door(Direction::West, Edge::to("A")))
//!     .build()
//!     .await?;
//!
//! dungeon.load_starting().await?;
//! dungeon.traverse_door(Direction::East).await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod dungeon;
mod error;
pub mod telemetry;

pub use config::DungeonConfig;
pub use dungeon::{Dungeon, DungeonBuilder, DungeonEngine};
pub use error::DelveError;

pub use delve_graph as graph;
pub use delve_scene as scene;
pub use delve_transition as transition;
pub use delve_watchdog as watchdog;

pub mod prelude {
    pub use crate::{DelveError, Dungeon, DungeonBuilder, DungeonConfig, DungeonEngine};
    pub use delve_graph::{
        ContentSpawn, Direction, Edge, FloorKind, Position, RoomDefinition, RoomGraph, RoomId,
    };
    pub use delve_scene::{CurtainConfig, FadeCurtain, Scene, SceneBuilder, SceneLayout};
    pub use delve_transition::{
        BuildFault, EngineConfig, NavigationError, Presenter, RoomBuilder, RoomEvent,
        SpawnTable, TransitionEngine, TransitionReport,
    };
    pub use delve_watchdog::{TimeScale, TransitionMonitor, Watchdog, WatchdogConfig};
}
