//! Room graph for Delve.
//!
//! Holds the dungeon's room definitions and the directed edges between
//! them (doors, stairs, trapdoors, secret passages).
//!
//! # Key types
//!
//! - [`RoomGraph`]: idempotent registration and lookup by id
//! - [`RoomDefinition`]: one room, its edges, spawn points and content
//! - [`Edge`]: a directed connection with an optional key requirement
//! - [`Direction`] / [`FloorKind`]: the edge slots a room can fill
//!
//! Edges are resolved lazily. Registering a room whose doors point at
//! rooms that do not exist yet is fine; the check happens when the
//! player walks through.

mod error;
mod graph;
mod room;
mod types;

pub use error::GraphError;
pub use graph::{DanglingEdge, RoomGraph};
pub use room::{ContentSpawn, Edge, RoomDefinition, SecretPassage, SpawnPoint};
pub use types::{Direction, FloorKind, Position, RoomId};
