//! `SceneBuilder`: places a room's doors, triggers and content into a
//! [`Scene`].
//!
//! The scene is a flat store of [`Fixture`]s. Each build returns a
//! [`SceneHandle`] listing the fixtures it created, which is all teardown
//! needs.

use std::collections::BTreeMap;
use std::fmt;

use delve_graph::{ContentSpawn, Direction, FloorKind, Position, RoomDefinition, RoomId};
use delve_transition::{BuildFault, RoomBuilder};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Identifier of one fixture in a [`Scene`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FixtureId(u64);

impl fmt::Display for FixtureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fx-{}", self.0)
    }
}

/// Axis-aligned collision box centred on a fixture's position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Collider {
    pub half_width: f32,
    pub half_height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentCategory {
    Enemy,
    Item,
}

/// One placed thing.
#[derive(Debug, Clone, PartialEq)]
pub enum Fixture {
    /// Door visual plus its blocking collider.
    Door {
        direction: Direction,
        position: Position,
        collider: Collider,
        destination: RoomId,
        required_key: Option<String>,
    },
    /// Stairs or trapdoor trigger.
    FloorTrigger {
        kind: FloorKind,
        position: Position,
        destination: RoomId,
    },
    /// Secret passage trigger.
    PassageTrigger {
        kind: String,
        position: Position,
        destination: RoomId,
    },
    /// Damage trigger for a hazard spawn.
    Hazard {
        position: Position,
        spawn: ContentSpawn,
    },
    /// Enemy or item, handed on untouched.
    Content {
        category: ContentCategory,
        spawn: ContentSpawn,
    },
}

// ---------------------------------------------------------------------------
// Scene
// ---------------------------------------------------------------------------

/// The container a [`SceneBuilder`] builds into.
#[derive(Debug, Default)]
pub struct Scene {
    next_id: u64,
    fixtures: BTreeMap<FixtureId, Fixture>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    fn spawn(&mut self, fixture: Fixture) -> FixtureId {
        self.next_id += 1;
        let id = FixtureId(self.next_id);
        self.fixtures.insert(id, fixture);
        id
    }

    fn despawn(&mut self, id: FixtureId) -> bool {
        self.fixtures.remove(&id).is_some()
    }

    pub fn get(&self, id: FixtureId) -> Option<&Fixture> {
        self.fixtures.get(&id)
    }

    pub fn fixtures(&self) -> impl Iterator<Item = &Fixture> {
        self.fixtures.values()
    }

    pub fn doors(&self) -> impl Iterator<Item = &Fixture> {
        self.fixtures()
            .filter(|fixture| matches!(fixture, Fixture::Door { .. }))
    }

    pub fn len(&self) -> usize {
        self.fixtures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixtures.is_empty()
    }
}

/// The fixtures created for one room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneHandle {
    pub room: RoomId,
    pub fixtures: Vec<FixtureId>,
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Room geometry the builder uses for default placements and bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneLayout {
    /// Room half-size; every placement must lie inside.
    pub half_width: f32,
    pub half_height: f32,
    pub door_collider: Collider,
    /// Default spots for floor edges that carry no explicit position.
    pub stairs_up: Position,
    pub stairs_down: Position,
    pub trapdoor: Position,
    /// Hard cap on fixtures per room.
    pub max_fixtures: usize,
}

impl Default for SceneLayout {
    fn default() -> Self {
        Self {
            half_width: 6.5,
            half_height: 4.5,
            door_collider: Collider {
                half_width: 0.5,
                half_height: 0.5,
            },
            stairs_up: Position::new(-4.0, 3.0),
            stairs_down: Position::new(4.0, 3.0),
            trapdoor: Position::ORIGIN,
            max_fixtures: 256,
        }
    }
}

impl SceneLayout {
    /// Where a door sits when its edge gives no position: centred on its wall.
    pub fn door_offset(&self, direction: Direction) -> Position {
        match direction {
            Direction::North => Position::new(0.0, self.half_height),
            Direction::South => Position::new(0.0, -self.half_height),
            Direction::East => Position::new(self.half_width, 0.0),
            Direction::West => Position::new(-self.half_width, 0.0),
        }
    }

    pub fn floor_offset(&self, kind: FloorKind) -> Position {
        match kind {
            FloorKind::StairsUp => self.stairs_up,
            FloorKind::StairsDown => self.stairs_down,
            FloorKind::Trapdoor => self.trapdoor,
        }
    }

    fn contains(&self, position: Position) -> bool {
        position.x.abs() <= self.half_width && position.y.abs() <= self.half_height
    }
}

// ---------------------------------------------------------------------------
// SceneBuilder
// ---------------------------------------------------------------------------

/// Reference [`RoomBuilder`] producing [`Fixture`]s in a [`Scene`].
///
/// A build that fails part-way leaves what it already placed in the
/// scene; those leftovers are swept at the start of the next build.
#[derive(Debug, Default)]
pub struct SceneBuilder {
    layout: SceneLayout,
    leftovers: Vec<FixtureId>,
}

impl SceneBuilder {
    pub fn new(layout: SceneLayout) -> Self {
        Self {
            layout,
            leftovers: Vec::new(),
        }
    }

    pub fn layout(&self) -> &SceneLayout {
        &self.layout
    }

    fn place(
        &self,
        definition: &RoomDefinition,
        scene: &mut Scene,
        placed: &mut Vec<FixtureId>,
        fixture: Fixture,
        position: Position,
    ) -> Result<(), BuildFault> {
        if !self.layout.contains(position) {
            return Err(BuildFault::new(format!(
                "room {}: fixture at {position} is outside the room",
                definition.id
            )));
        }
        if placed.len() >= self.layout.max_fixtures {
            return Err(BuildFault::new(format!(
                "room {}: more than {} fixtures",
                definition.id, self.layout.max_fixtures
            )));
        }
        placed.push(scene.spawn(fixture));
        Ok(())
    }

    fn populate(
        &self,
        definition: &RoomDefinition,
        scene: &mut Scene,
        placed: &mut Vec<FixtureId>,
    ) -> Result<(), BuildFault> {
        for (&direction, edge) in definition.doors.iter().filter(|(_, e)| e.exists) {
            let position = edge
                .position
                .unwrap_or_else(|| self.layout.door_offset(direction));
            let door = Fixture::Door {
                direction,
                position,
                collider: self.layout.door_collider,
                destination: edge.destination.clone(),
                required_key: edge.required_key.clone(),
            };
            self.place(definition, scene, placed, door, position)?;
        }

        for (&kind, edge) in definition.floors.iter().filter(|(_, e)| e.exists) {
            let position = edge
                .position
                .unwrap_or_else(|| self.layout.floor_offset(kind));
            let trigger = Fixture::FloorTrigger {
                kind,
                position,
                destination: edge.destination.clone(),
            };
            self.place(definition, scene, placed, trigger, position)?;
        }

        for passage in definition.secret_passages.iter().filter(|p| p.edge.exists) {
            let position = passage.edge.position.unwrap_or(Position::ORIGIN);
            let trigger = Fixture::PassageTrigger {
                kind: passage.kind.clone(),
                position,
                destination: passage.edge.destination.clone(),
            };
            self.place(definition, scene, placed, trigger, position)?;
        }

        for hazard in &definition.hazards {
            let position = hazard.position.unwrap_or(Position::ORIGIN);
            let trigger = Fixture::Hazard {
                position,
                spawn: hazard.clone(),
            };
            self.place(definition, scene, placed, trigger, position)?;
        }

        let content = definition
            .enemies
            .iter()
            .map(|spawn| (ContentCategory::Enemy, spawn))
            .chain(definition.items.iter().map(|spawn| (ContentCategory::Item, spawn)));
        for (category, spawn) in content {
            let position = spawn.position.unwrap_or(Position::ORIGIN);
            let fixture = Fixture::Content {
                category,
                spawn: spawn.clone(),
            };
            self.place(definition, scene, placed, fixture, position)?;
        }

        Ok(())
    }
}

impl RoomBuilder for SceneBuilder {
    type Container = Scene;
    type Handle = SceneHandle;

    fn build(
        &mut self,
        definition: &RoomDefinition,
        scene: &mut Scene,
    ) -> Result<SceneHandle, BuildFault> {
        for id in self.leftovers.drain(..) {
            scene.despawn(id);
        }

        let mut placed = Vec::new();
        match self.populate(definition, scene, &mut placed) {
            Ok(()) => {
                tracing::debug!(room = %definition.id, fixtures = placed.len(), "room built");
                Ok(SceneHandle {
                    room: definition.id.clone(),
                    fixtures: placed,
                })
            }
            Err(fault) => {
                tracing::warn!(
                    room = %definition.id,
                    placed = placed.len(),
                    "room partially built"
                );
                self.leftovers = placed;
                Err(fault)
            }
        }
    }

    fn teardown(&mut self, handle: SceneHandle, scene: &mut Scene) {
        let removed = handle
            .fixtures
            .into_iter()
            .filter(|id| scene.despawn(*id))
            .count();
        tracing::debug!(room = %handle.room, removed, "room torn down");
    }
}
