//! Room definitions and the edges that connect them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Direction, FloorKind, Position, RoomId};

// ---------------------------------------------------------------------------
// Edges
// ---------------------------------------------------------------------------

/// A directed connection from one room to another.
///
/// Edges are not checked when a room is registered: `destination` only
/// has to resolve at the moment someone walks through it, which lets
/// catalogs be assembled incrementally and out of order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Whether the connection is present at all. A definition may keep a
    /// slot filled with `exists: false` (walled-up door, collapsed stairs).
    #[serde(default = "default_true")]
    pub exists: bool,

    /// The room this edge leads to.
    pub destination: RoomId,

    /// Capability token needed to use the edge, e.g. a key colour.
    ///
    /// The transition engine only exposes this; deciding whether the
    /// player may pass (and consuming the key) is the caller's job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_key: Option<String>,

    /// Where the builder should place the edge's visual, if not at the
    /// default spot for its slot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

fn default_true() -> bool {
    true
}

impl Edge {
    /// An existing, unlocked edge to `destination`.
    pub fn to(destination: impl Into<RoomId>) -> Self {
        Self {
            exists: true,
            destination: destination.into(),
            required_key: None,
            position: None,
        }
    }

    /// Requires the given key token to pass.
    pub fn locked(mut self, key: impl Into<String>) -> Self {
        self.required_key = Some(key.into());
        self
    }

    /// Places the edge at an explicit position.
    pub fn at(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    /// Marks the edge as not present.
    pub fn sealed(mut self) -> Self {
        self.exists = false;
        self
    }

    pub fn is_traversable(&self) -> bool {
        self.exists
    }

    pub fn is_locked(&self) -> bool {
        self.required_key.is_some()
    }
}

/// A hidden edge, identified by its `kind` (e.g. `"bookcase"`, `"crack"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecretPassage {
    pub kind: String,
    #[serde(flatten)]
    pub edge: Edge,
}

// ---------------------------------------------------------------------------
// Spawn points and content
// ---------------------------------------------------------------------------

/// A named place the player can be put on arrival.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnPoint {
    pub id: String,
    pub position: Position,
}

/// One enemy, item or hazard entry of a room.
///
/// The graph and the transition engine never look inside these; they
/// are handed to the room builder exactly as authored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentSpawn {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

impl ContentSpawn {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            position: None,
            properties: serde_json::Map::new(),
        }
    }

    pub fn at(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

// ---------------------------------------------------------------------------
// RoomDefinition
// ---------------------------------------------------------------------------

/// Everything the engine and the builder need to know about one room.
///
/// Definitions are logically immutable once registered; the only way to
/// change one is to register a new definition under the same id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomDefinition {
    pub id: RoomId,
    pub name: String,
    #[serde(default)]
    pub floor: i32,
    #[serde(default)]
    pub is_start: bool,
    #[serde(default)]
    pub is_exit: bool,
    #[serde(default)]
    pub doors: BTreeMap<Direction, Edge>,
    #[serde(default)]
    pub floors: BTreeMap<FloorKind, Edge>,
    #[serde(default)]
    pub secret_passages: Vec<SecretPassage>,
    #[serde(default)]
    pub spawn_points: Vec<SpawnPoint>,
    #[serde(default)]
    pub enemies: Vec<ContentSpawn>,
    #[serde(default)]
    pub items: Vec<ContentSpawn>,
    #[serde(default)]
    pub hazards: Vec<ContentSpawn>,
}

impl RoomDefinition {
    /// An empty room on floor 0 with no edges.
    pub fn new(id: impl Into<RoomId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            floor: 0,
            is_start: false,
            is_exit: false,
            doors: BTreeMap::new(),
            floors: BTreeMap::new(),
            secret_passages: Vec::new(),
            spawn_points: Vec::new(),
            enemies: Vec::new(),
            items: Vec::new(),
            hazards: Vec::new(),
        }
    }

    pub fn on_floor(mut self, floor: i32) -> Self {
        self.floor = floor;
        self
    }

    pub fn starting(mut self) -> Self {
        self.is_start = true;
        self
    }

    pub fn exit(mut self) -> Self {
        self.is_exit = true;
        self
    }

    /// Sets the door in `direction`, replacing any previous one.
    pub fn with_door(mut self, direction: Direction, edge: Edge) -> Self {
        self.doors.insert(direction, edge);
        self
    }

    pub fn with_floor(mut self, kind: FloorKind, edge: Edge) -> Self {
        self.floors.insert(kind, edge);
        self
    }

    pub fn with_secret_passage(mut self, kind: impl Into<String>, edge: Edge) -> Self {
        self.secret_passages.push(SecretPassage {
            kind: kind.into(),
            edge,
        });
        self
    }

    pub fn with_spawn_point(mut self, id: impl Into<String>, position: Position) -> Self {
        self.spawn_points.push(SpawnPoint {
            id: id.into(),
            position,
        });
        self
    }

    pub fn with_enemy(mut self, spawn: ContentSpawn) -> Self {
        self.enemies.push(spawn);
        self
    }

    pub fn with_item(mut self, spawn: ContentSpawn) -> Self {
        self.items.push(spawn);
        self
    }

    pub fn with_hazard(mut self, spawn: ContentSpawn) -> Self {
        self.hazards.push(spawn);
        self
    }

    /// The door edge in `direction`, if the slot is filled (existing or not).
    pub fn door(&self, direction: Direction) -> Option<&Edge> {
        self.doors.get(&direction)
    }

    pub fn floor_edge(&self, kind: FloorKind) -> Option<&Edge> {
        self.floors.get(&kind)
    }

    pub fn secret_passage(&self, kind: &str) -> Option<&SecretPassage> {
        self.secret_passages.iter().find(|p| p.kind == kind)
    }

    /// Finds an explicitly authored spawn point. First match wins.
    pub fn spawn_point(&self, id: &str) -> Option<&SpawnPoint> {
        self.spawn_points.iter().find(|s| s.id == id)
    }

    /// Iterates every existing edge of the room with a short label
    /// (`"door:east"`, `"floor:trapdoor"`, `"secret:crack"`).
    pub fn edges(&self) -> impl Iterator<Item = (String, &Edge)> {
        let doors = self
            .doors
            .iter()
            .map(|(dir, edge)| (format!("door:{dir}"), edge));
        let floors = self
            .floors
            .iter()
            .map(|(kind, edge)| (format!("floor:{kind}"), edge));
        let secrets = self
            .secret_passages
            .iter()
            .map(|p| (format!("secret:{}", p.kind), &p.edge));
        doors
            .chain(floors)
            .chain(secrets)
            .filter(|(_, edge)| edge.exists)
    }
}
