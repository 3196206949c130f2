//! `Dungeon` builder and assembled runtime.
//!
//! Ties the layers together: room graph → transition engine (on the
//! reference curtain and scene builder) → watchdog.

use std::sync::Arc;

use delve_graph::{Direction, FloorKind, RoomDefinition, RoomGraph, RoomId};
use delve_scene::{FadeCurtain, Scene, SceneBuilder};
use delve_transition::{EventReceiver, RoomRegistrar, TransitionEngine, TransitionReport};
use delve_watchdog::{TimeScale, Watchdog, WatchdogHandle, WatchdogMetrics};

use crate::{DelveError, DungeonConfig};

/// The engine type a [`Dungeon`] runs.
pub type DungeonEngine = TransitionEngine<FadeCurtain, SceneBuilder>;

/// Builder for assembling a [`Dungeon`].
///
/// # Example
///
/// ```rust,ignore
/// use delve::prelude::*;
///
/// let dungeon = Dungeon::builder()
///     .catalog(include_str!("rooms.json"))
///     .config(DungeonConfig::default())
///     .build()
///     .await?;
/// dungeon.load_starting().await?;
/// ```
pub struct DungeonBuilder {
    rooms: Vec<RoomDefinition>,
    catalogs: Vec<String>,
    config: DungeonConfig,
    time_scale: TimeScale,
}

impl DungeonBuilder {
    /// Creates a builder with no rooms and default settings.
    pub fn new() -> Self {
        Self {
            rooms: Vec::new(),
            catalogs: Vec::new(),
            config: DungeonConfig::default(),
            time_scale: TimeScale::new(),
        }
    }

    /// Adds one room definition.
    pub fn room(mut self, definition: RoomDefinition) -> Self {
        self.rooms.push(definition);
        self
    }

    pub fn rooms(mut self, definitions: impl IntoIterator<Item = RoomDefinition>) -> Self {
        self.rooms.extend(definitions);
        self
    }

    /// Adds a JSON room catalog (an array of room definitions). Parsed
    /// by [`build`](Self::build), after the individually added rooms.
    pub fn catalog(mut self, json: impl Into<String>) -> Self {
        self.catalogs.push(json.into());
        self
    }

    pub fn config(mut self, config: DungeonConfig) -> Self {
        self.config = config;
        self
    }

    /// Shares an existing time scale with the watchdog instead of a
    /// fresh one.
    pub fn time_scale(mut self, time_scale: TimeScale) -> Self {
        self.time_scale = time_scale;
        self
    }

    /// Assembles the dungeon and, if enabled, spawns its watchdog.
    pub async fn build(self) -> Result<Dungeon, DelveError> {
        let mut graph = RoomGraph::from_definitions(self.rooms);
        for catalog in &self.catalogs {
            graph.extend_from_json(catalog)?;
        }

        for dangling in graph.dangling_edges() {
            tracing::warn!(
                room = %dangling.from,
                edge = %dangling.edge,
                destination = %dangling.destination,
                "edge points at an unregistered room"
            );
        }

        let config = self.config.validated();
        let curtain = Arc::new(FadeCurtain::new(config.curtain.clone()));
        let engine = TransitionEngine::new(
            graph,
            Arc::clone(&curtain),
            SceneBuilder::new(config.layout.clone()),
            Scene::new(),
            config.engine.clone(),
        );

        let watchdog = config.watchdog_enabled.then(|| {
            Watchdog::new(config.watchdog.clone(), engine.clone(), self.time_scale.clone()).spawn()
        });

        tracing::info!(
            rooms = engine.with_graph(RoomGraph::len),
            watchdog = watchdog.is_some(),
            "dungeon ready"
        );

        Ok(Dungeon {
            engine,
            curtain,
            time_scale: self.time_scale,
            watchdog,
        })
    }
}

impl Default for DungeonBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running dungeon: engine, curtain, time scale and watchdog.
///
/// Navigation methods mirror the engine's but return [`DelveError`].
pub struct Dungeon {
    engine: DungeonEngine,
    curtain: Arc<FadeCurtain>,
    time_scale: TimeScale,
    watchdog: Option<WatchdogHandle>,
}

impl Dungeon {
    /// Creates a new builder.
    pub fn builder() -> DungeonBuilder {
        DungeonBuilder::new()
    }

    pub async fn load_starting(&self) -> Result<TransitionReport, DelveError> {
        Ok(self.engine.load_starting().await?)
    }

    pub async fn load_room(
        &self,
        room_id: impl Into<RoomId>,
        spawn_id: impl Into<String>,
    ) -> Result<TransitionReport, DelveError> {
        Ok(self.engine.load_room(room_id, spawn_id).await?)
    }

    pub async fn traverse_door(&self, direction: Direction) -> Result<TransitionReport, DelveError> {
        Ok(self.engine.traverse_door(direction).await?)
    }

    pub async fn traverse_floor(&self, kind: FloorKind) -> Result<TransitionReport, DelveError> {
        Ok(self.engine.traverse_floor(kind).await?)
    }

    pub async fn traverse_secret_passage(
        &self,
        kind: &str,
        destination: impl Into<RoomId>,
    ) -> Result<TransitionReport, DelveError> {
        Ok(self.engine.traverse_secret_passage(kind, destination).await?)
    }

    pub fn engine(&self) -> &DungeonEngine {
        &self.engine
    }

    pub fn curtain(&self) -> &Arc<FadeCurtain> {
        &self.curtain
    }

    pub fn time_scale(&self) -> &TimeScale {
        &self.time_scale
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.engine.subscribe()
    }

    pub fn registrar(&self) -> RoomRegistrar {
        self.engine.registrar()
    }

    pub fn has_watchdog(&self) -> bool {
        self.watchdog.is_some()
    }

    /// Stops the watchdog (if any) and returns its final metrics.
    pub async fn shutdown(self) -> Option<WatchdogMetrics> {
        let metrics = match self.watchdog {
            Some(handle) => handle.shutdown().await,
            None => None,
        };
        tracing::info!(
            transitions = self.engine.metrics().transitions_completed,
            "dungeon shut down"
        );
        metrics
    }
}
