//! Identity and geometry types shared by every layer of Delve.
//!
//! These are the small value types that show up in edges, spawn points,
//! lifecycle events and logs. They all serialize, because the room
//! catalog can be loaded from JSON.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RoomId
// ---------------------------------------------------------------------------

/// A unique identifier for a room definition.
///
/// Room ids are authored strings (`"crypt_entrance"`, `"floor2_vault"`)
/// rather than counters, because catalogs and runtime generators name
/// rooms before the graph ever sees them and edges refer to rooms by
/// name.
///
/// `#[serde(transparent)]` keeps the JSON form a bare string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    /// Creates a room id from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for RoomId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// A point in room-local coordinates. `(0, 0)` is the room centre.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    /// The room centre, used when no better spawn position exists.
    pub const ORIGIN: Position = Position { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// The four cardinal door slots of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    /// All directions, in clockwise order starting at North.
    pub const ALL: [Direction; 4] = [Self::North, Self::East, Self::South, Self::West];

    /// The direction on the far side of a doorway.
    pub fn opposite(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::East => Self::West,
            Self::South => Self::North,
            Self::West => Self::East,
        }
    }

    /// Lower-case name used in spawn ids.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::North => "north",
            Self::East => "east",
            Self::South => "south",
            Self::West => "west",
        }
    }

    /// The conventional spawn id for a door on this side of a room,
    /// e.g. `"south_door"`.
    pub fn spawn_id(self) -> String {
        format!("{}_door", self.as_str())
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// FloorKind
// ---------------------------------------------------------------------------

/// Edges that change floors rather than crossing a wall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FloorKind {
    StairsUp,
    StairsDown,
    Trapdoor,
}

impl FloorKind {
    pub const ALL: [FloorKind; 3] = [Self::StairsUp, Self::StairsDown, Self::Trapdoor];

    /// Spawn id used in the destination room when arriving through this
    /// edge. Going up the stairs lands you at the top of the *down*
    /// stairs of the floor above, and vice versa.
    pub fn arrival_spawn_id(self) -> &'static str {
        match self {
            Self::StairsUp => "stairs_down",
            Self::StairsDown => "stairs_up",
            Self::Trapdoor => "trapdoor_exit",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::StairsUp => "stairs_up",
            Self::StairsDown => "stairs_down",
            Self::Trapdoor => "trapdoor",
        }
    }
}

impl fmt::Display for FloorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
