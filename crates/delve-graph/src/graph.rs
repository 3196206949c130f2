//! The room graph store: registers definitions and resolves ids.
//!
//! # Concurrency note
//!
//! `RoomGraph` is a plain data structure with no interior locking. The
//! transition engine wraps it in a lock and hands out registrar handles
//! to generators, so the store itself stays simple.

use std::collections::HashMap;

use crate::{Edge, GraphError, RoomDefinition, RoomId};

/// An edge whose destination is not (yet) registered.
#[derive(Debug, Clone, PartialEq)]
pub struct DanglingEdge {
    pub from: RoomId,
    /// Label of the slot, e.g. `"door:east"`.
    pub edge: String,
    pub destination: RoomId,
}

/// All known room definitions, keyed by id.
///
/// Iteration follows first-seen insertion order. Re-registering an id
/// replaces the stored definition in place; it never adds a second
/// entry or moves the room to the end.
#[derive(Debug, Default, Clone)]
pub struct RoomGraph {
    rooms: HashMap<RoomId, RoomDefinition>,

    /// First-seen order of ids. Kept in sync with `rooms`.
    order: Vec<RoomId>,
}

impl RoomGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from a collection of definitions, registering them
    /// in iteration order (later duplicates overwrite earlier ones).
    pub fn from_definitions(definitions: impl IntoIterator<Item = RoomDefinition>) -> Self {
        let mut graph = Self::new();
        for definition in definitions {
            graph.register(definition);
        }
        graph
    }

    /// Parses a JSON array of room definitions into a new graph.
    pub fn from_json(catalog: &str) -> Result<Self, GraphError> {
        let mut graph = Self::new();
        graph.extend_from_json(catalog)?;
        Ok(graph)
    }

    /// Registers every definition of a JSON catalog. Returns how many
    /// ids were new. Nothing is registered if the catalog fails to parse.
    pub fn extend_from_json(&mut self, catalog: &str) -> Result<usize, GraphError> {
        let definitions: Vec<RoomDefinition> = serde_json::from_str(catalog)?;
        let mut added = 0;
        for definition in definitions {
            if self.register(definition) {
                added += 1;
            }
        }
        tracing::debug!(added, total = self.len(), "room catalog loaded");
        Ok(added)
    }

    /// Inserts or replaces a definition. Returns `true` if the id was new.
    pub fn register(&mut self, definition: RoomDefinition) -> bool {
        let id = definition.id.clone();
        let is_new = self.rooms.insert(id.clone(), definition).is_none();
        if is_new {
            tracing::debug!(room = %id, "room registered");
            self.order.push(id);
        } else {
            tracing::debug!(room = %id, "room definition replaced");
        }
        is_new
    }

    /// Looks up a definition by id.
    pub fn get(&self, id: &RoomId) -> Result<&RoomDefinition, GraphError> {
        self.rooms
            .get(id)
            .ok_or_else(|| GraphError::NotFound(id.clone()))
    }

    pub fn contains(&self, id: &RoomId) -> bool {
        self.rooms.contains_key(id)
    }

    /// The room a new game starts in: the first room flagged as a
    /// start room, otherwise the first room ever registered.
    pub fn starting_room(&self) -> Option<&RoomDefinition> {
        self.iter()
            .find(|room| room.is_start)
            .or_else(|| self.iter().next())
    }

    /// Room ids in first-seen order.
    pub fn ids(&self) -> impl Iterator<Item = &RoomId> {
        self.order.iter()
    }

    /// Definitions in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &RoomDefinition> {
        self.order.iter().filter_map(|id| self.rooms.get(id))
    }

    pub fn rooms_on_floor(&self, floor: i32) -> impl Iterator<Item = &RoomDefinition> {
        self.iter().filter(move |room| room.floor == floor)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Lists every existing edge that points at an unregistered room.
    ///
    /// Purely diagnostic: the graph does not reject such edges, since
    /// the missing room may still be registered before anyone uses them.
    pub fn dangling_edges(&self) -> Vec<DanglingEdge> {
        self.iter()
            .flat_map(|room| {
                room.edges()
                    .filter(|(_, edge)| !self.resolves(edge))
                    .map(|(label, edge)| DanglingEdge {
                        from: room.id.clone(),
                        edge: label,
                        destination: edge.destination.clone(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    fn resolves(&self, edge: &Edge) -> bool {
        self.rooms.contains_key(&edge.destination)
    }
}
