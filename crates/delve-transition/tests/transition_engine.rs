//! Integration tests for the transition engine using a mock presenter
//! and a mock builder.
//!
//! Runs on Tokio's paused clock: fades are plain `sleep`s, so a 0.5s
//! fade completes instantly in wall time but exactly 0.5s in engine time.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use delve_graph::{Direction, Edge, FloorKind, Position, RoomDefinition, RoomGraph, RoomId};
use delve_transition::{
    BuildFault, EngineConfig, EventReceiver, NavigationError, Presenter, RoomBuilder, RoomEvent,
    TransitionEngine,
};
use delve_watchdog::{TimeScale, TransitionMonitor, Watchdog, WatchdogConfig};
use tokio::time::{self, Instant};

// =========================================================================
// Mock presenter
// =========================================================================

#[derive(Default)]
struct MockPresenter {
    opacity: Mutex<f32>,
    /// Fade-in "finishes" but leaves the overlay up, as if interrupted.
    stick_after_fade_in: AtomicBool,
    /// Fade-out never finishes.
    hang_fade_out: AtomicBool,
    force_clears: AtomicU32,
}

impl MockPresenter {
    fn set_opacity(&self, value: f32) {
        *self.opacity.lock().unwrap() = value;
    }

    fn force_clears(&self) -> u32 {
        self.force_clears.load(Ordering::SeqCst)
    }
}

impl Presenter for MockPresenter {
    async fn fade_out(&self, duration: Duration) {
        if self.hang_fade_out.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        time::sleep(duration).await;
        self.set_opacity(1.0);
    }

    async fn fade_in(&self, duration: Duration) {
        time::sleep(duration).await;
        if !self.stick_after_fade_in.load(Ordering::SeqCst) {
            self.set_opacity(0.0);
        }
    }

    fn current_opacity(&self) -> f32 {
        *self.opacity.lock().unwrap()
    }

    fn force_clear(&self) {
        self.set_opacity(0.0);
        self.force_clears.fetch_add(1, Ordering::SeqCst);
    }
}

// =========================================================================
// Mock builder
// =========================================================================

#[derive(Clone, Default)]
struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    fn push(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

#[derive(Default)]
struct MockBuilder {
    journal: Journal,
    fail_on: Option<RoomId>,
    panic_on: Option<RoomId>,
    panic_on_teardown: Option<RoomId>,
}

impl RoomBuilder for MockBuilder {
    type Container = Vec<RoomId>;
    type Handle = RoomId;

    fn build(
        &mut self,
        definition: &RoomDefinition,
        container: &mut Vec<RoomId>,
    ) -> Result<RoomId, BuildFault> {
        self.journal.push(format!("build:{}", definition.id));
        if self.fail_on.as_ref() == Some(&definition.id) {
            return Err(BuildFault::new("tileset missing"));
        }
        if self.panic_on.as_ref() == Some(&definition.id) {
            panic!("hazard spawner exploded");
        }
        container.push(definition.id.clone());
        Ok(definition.id.clone())
    }

    fn teardown(&mut self, handle: RoomId, container: &mut Vec<RoomId>) {
        self.journal.push(format!("teardown:{handle}"));
        if self.panic_on_teardown.as_ref() == Some(&handle) {
            panic!("despawn of {handle} failed");
        }
        container.retain(|room| *room != handle);
    }
}

// =========================================================================
// Helpers
// =========================================================================

type Engine = TransitionEngine<MockPresenter, MockBuilder>;

fn id(s: &str) -> RoomId {
    RoomId::new(s)
}

/// A (east → B), B (west → A, stairs down → C), C (stairs up → B).
fn abc_graph() -> RoomGraph {
    RoomGraph::from_definitions([
        RoomDefinition::new("a", "Antechamber").with_door(Direction::East, Edge::to("b")),
        RoomDefinition::new("b", "Barracks")
            .with_door(Direction::West, Edge::to("a"))
            .with_floor(FloorKind::StairsDown, Edge::to("c")),
        RoomDefinition::new("c", "Cellar")
            .on_floor(-1)
            .with_floor(FloorKind::StairsUp, Edge::to("b")),
    ])
}

fn engine_with(graph: RoomGraph, builder: MockBuilder, config: EngineConfig) -> (Engine, Arc<MockPresenter>) {
    let presenter = Arc::new(MockPresenter::default());
    let engine = TransitionEngine::new(graph, Arc::clone(&presenter), builder, Vec::new(), config);
    (engine, presenter)
}

fn engine(graph: RoomGraph) -> (Engine, Arc<MockPresenter>) {
    engine_with(graph, MockBuilder::default(), EngineConfig::default())
}

fn drain(rx: &mut EventReceiver) -> Vec<RoomEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn names(events: &[RoomEvent]) -> Vec<&'static str> {
    events.iter().map(RoomEvent::name).collect()
}

// =========================================================================
// Happy path
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_load_starting_enters_first_room() {
    let (engine, presenter) = engine(abc_graph());
    let mut events = engine.subscribe();

    let report = engine.load_starting().await.unwrap();

    assert_eq!(report.from, None);
    assert_eq!(report.to, id("a"));
    assert_eq!(report.spawn, Some(Position::ORIGIN));
    assert!(report.outcome.succeeded());

    let state = engine.state();
    assert_eq!(state.current, Some(id("a")));
    assert_eq!(state.previous, None);
    assert!(!state.busy);
    assert_eq!(state.transition_started, None);
    assert_eq!(presenter.current_opacity(), 0.0);

    assert_eq!(
        names(&drain(&mut events)),
        vec!["RoomTransition", "RoomLoadStarted", "RoomLoadCompleted", "RoomEntered"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_end_to_end_door_then_stairs() {
    let (engine, _presenter) = engine(abc_graph());
    engine.load_starting().await.unwrap();

    let report = engine.traverse_door(Direction::East).await.unwrap();
    assert_eq!(report.from, Some(id("a")));
    assert_eq!(report.to, id("b"));
    assert_eq!(report.spawn_id, "west_door");
    assert_eq!(report.spawn, Some(engine.config().spawn_table.resolve("west_door")));
    assert_eq!(report.spawn, Some(Position::new(-6.0, 0.0)));
    assert_eq!(engine.state().current, Some(id("b")));

    let report = engine.traverse_floor(FloorKind::StairsDown).await.unwrap();
    assert_eq!(report.to, id("c"));
    assert_eq!(report.spawn_id, "stairs_up");
    assert_eq!(report.spawn, Some(Position::new(-4.0, 3.0)));

    let state = engine.state();
    assert_eq!(state.current, Some(id("c")));
    assert_eq!(state.previous, Some(id("b")));
    assert_eq!(engine.metrics().transitions_completed, 3);
}

#[tokio::test(start_paused = true)]
async fn test_load_completed_carries_spawn_and_definition() {
    let (engine, _presenter) = engine(abc_graph());
    engine.load_starting().await.unwrap();
    let mut events = engine.subscribe();

    engine.traverse_door(Direction::East).await.unwrap();

    let events = drain(&mut events);
    match &events[0] {
        RoomEvent::RoomTransition { from, to } => {
            assert_eq!(from.as_ref(), Some(&id("a")));
            assert_eq!(to, &id("b"));
        }
        other => panic!("expected RoomTransition, got {other:?}"),
    }
    match &events[2] {
        RoomEvent::RoomLoadCompleted { definition, spawn } => {
            assert_eq!(definition.id, id("b"));
            assert_eq!(*spawn, Position::new(-6.0, 0.0));
        }
        other => panic!("expected RoomLoadCompleted, got {other:?}"),
    }
    assert_eq!(events[3], RoomEvent::RoomEntered { room: id("b") });
}

#[tokio::test(start_paused = true)]
async fn test_transition_takes_both_fades() {
    let (engine, _presenter) = engine(abc_graph());
    let started = Instant::now();
    engine.load_starting().await.unwrap();
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(1));
    assert!(elapsed < Duration::from_millis(1050));
}

// =========================================================================
// Spawn resolution
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_explicit_spawn_point_overrides_default_table() {
    let mut graph = abc_graph();
    graph.register(
        RoomDefinition::new("b", "Barracks")
            .with_door(Direction::West, Edge::to("a"))
            .with_spawn_point("west_door", Position::new(-5.0, 1.5)),
    );
    let (engine, _presenter) = engine(graph);
    engine.load_starting().await.unwrap();

    let report = engine.traverse_door(Direction::East).await.unwrap();
    assert_eq!(report.spawn, Some(Position::new(-5.0, 1.5)));
}

#[tokio::test(start_paused = true)]
async fn test_secret_passage_spawn_falls_back_to_origin() {
    let (engine, _presenter) = engine(abc_graph());
    engine.load_starting().await.unwrap();

    let report = engine.traverse_secret_passage("crack", "c").await.unwrap();
    assert_eq!(report.spawn_id, "secret_crack");
    assert_eq!(report.spawn, Some(Position::ORIGIN));
    assert_eq!(engine.state().current, Some(id("c")));
}

#[tokio::test(start_paused = true)]
async fn test_secret_passage_uses_named_spawn_point() {
    let mut graph = abc_graph();
    graph.register(RoomDefinition::new("vault", "Vault").with_spawn_point("secret_bookcase", Position::new(2.0, 2.0)));
    let (engine, _presenter) = engine(graph);
    engine.load_starting().await.unwrap();

    let report = engine.traverse_secret_passage("bookcase", "vault").await.unwrap();
    assert_eq!(report.spawn, Some(Position::new(2.0, 2.0)));
}

// =========================================================================
// No-ops and configuration errors
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_missing_door_is_a_noop() {
    let (engine, _presenter) = engine(abc_graph());
    engine.load_starting().await.unwrap();
    let mut events = engine.subscribe();
    let before = engine.state();

    let result = engine.traverse_door(Direction::North).await;

    assert_eq!(
        result.unwrap_err(),
        NavigationError::NoEdge { room: id("a"), edge: "door:north".into() }
    );
    assert_eq!(engine.state(), before);
    assert!(drain(&mut events).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_sealed_door_is_a_noop() {
    let graph = RoomGraph::from_definitions([
        RoomDefinition::new("a", "A").with_door(Direction::South, Edge::to("b").sealed()),
        RoomDefinition::new("b", "B"),
    ]);
    let (engine, _presenter) = engine(graph);
    engine.load_starting().await.unwrap();

    let result = engine.traverse_door(Direction::South).await;
    assert!(matches!(result, Err(NavigationError::NoEdge { .. })));
    assert_eq!(engine.state().current, Some(id("a")));
}

#[tokio::test(start_paused = true)]
async fn test_missing_floor_edge_is_a_noop() {
    let (engine, _presenter) = engine(abc_graph());
    engine.load_starting().await.unwrap();

    let result = engine.traverse_floor(FloorKind::Trapdoor).await;
    assert!(matches!(result, Err(NavigationError::NoEdge { .. })));
    assert_eq!(engine.metrics().transitions_started, 1);
}

#[tokio::test(start_paused = true)]
async fn test_traverse_before_any_room_is_loaded() {
    let (engine, _presenter) = engine(abc_graph());
    let result = engine.traverse_door(Direction::East).await;
    assert_eq!(result.unwrap_err(), NavigationError::NoCurrentRoom);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_room_aborts_before_any_state_change() {
    let (engine, presenter) = engine(abc_graph());
    engine.load_starting().await.unwrap();
    let mut events = engine.subscribe();
    let before = engine.state();

    let result = engine.load_room("nowhere", "north_door").await;

    let err = result.unwrap_err();
    assert_eq!(err, NavigationError::UnknownRoom(id("nowhere")));
    assert!(err.is_configuration_error());
    assert_eq!(engine.state(), before);
    assert!(!engine.is_busy());
    assert!(drain(&mut events).is_empty());
    assert_eq!(engine.metrics().transitions_started, 1);
    assert_eq!(presenter.current_opacity(), 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_dangling_door_resolves_once_room_is_generated() {
    let graph = RoomGraph::from_definitions([
        RoomDefinition::new("a", "A").with_door(Direction::North, Edge::to("generated")),
    ]);
    let (engine, _presenter) = engine(graph);
    engine.load_starting().await.unwrap();

    let result = engine.traverse_door(Direction::North).await;
    assert_eq!(result.unwrap_err(), NavigationError::UnknownRoom(id("generated")));

    let registrar = engine.registrar();
    assert!(registrar.register(RoomDefinition::new("generated", "Generated")));
    assert!(registrar.contains(&id("generated")));

    let report = engine.traverse_door(Direction::North).await.unwrap();
    assert_eq!(report.to, id("generated"));
    assert_eq!(report.spawn_id, "south_door");
}

#[tokio::test(start_paused = true)]
async fn test_load_starting_with_empty_graph() {
    let (engine, _presenter) = engine(RoomGraph::new());
    let err = engine.load_starting().await.unwrap_err();
    assert_eq!(err, NavigationError::NoStartingRoom);
    assert_eq!(engine.state(), Default::default());
}

#[tokio::test(start_paused = true)]
async fn test_locked_door_is_exposed_but_not_enforced() {
    let graph = RoomGraph::from_definitions([
        RoomDefinition::new("a", "A").with_door(Direction::East, Edge::to("b").locked("red")),
        RoomDefinition::new("b", "B"),
    ]);
    let (engine, _presenter) = engine(graph);
    engine.load_starting().await.unwrap();

    let door = engine.door(Direction::East).unwrap();
    assert_eq!(door.required_key.as_deref(), Some("red"));
    assert!(engine.door(Direction::West).is_none());

    // Deciding whether the player holds the key is the caller's job.
    engine.traverse_door(Direction::East).await.unwrap();
    assert_eq!(engine.state().current, Some(id("b")));
}

// =========================================================================
// Reentrancy
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_request_while_busy_is_rejected_once_and_changes_nothing() {
    let (engine, _presenter) = engine(abc_graph());
    engine.load_starting().await.unwrap();

    let background = engine.clone();
    let in_flight = tokio::spawn(async move { background.traverse_door(Direction::East).await });
    while !engine.is_busy() {
        tokio::task::yield_now().await;
    }

    let before = engine.state();
    let result = engine.load_room("c", "stairs_up").await;
    assert_eq!(result.unwrap_err(), NavigationError::Busy);
    assert_eq!(engine.state(), before);
    assert_eq!(engine.metrics().rejected, 1);

    let report = in_flight.await.unwrap().unwrap();
    assert_eq!(report.to, id("b"));
    assert_eq!(engine.state().current, Some(id("b")));
}

#[tokio::test(start_paused = true)]
async fn test_traverse_while_busy_is_rejected() {
    let (engine, _presenter) = engine(abc_graph());
    engine.load_starting().await.unwrap();

    let background = engine.clone();
    let in_flight = tokio::spawn(async move { background.traverse_door(Direction::East).await });
    while !engine.is_busy() {
        tokio::task::yield_now().await;
    }

    let result = engine.traverse_door(Direction::East).await;
    assert_eq!(result.unwrap_err(), NavigationError::Busy);
    in_flight.await.unwrap().unwrap();
    assert_eq!(engine.metrics().transitions_completed, 2);
}

#[tokio::test(start_paused = true)]
async fn test_busy_until_fade_in_completes() {
    let (engine, _presenter) = engine(abc_graph());
    let mut events = engine.subscribe();

    let background = engine.clone();
    let in_flight = tokio::spawn(async move { background.load_starting().await });

    // Fade-out ends at 0.5s; fade-in runs until 1.0s.
    time::sleep(Duration::from_millis(600)).await;
    assert!(engine.is_busy());
    assert_eq!(engine.state().current, Some(id("a")));
    assert_eq!(
        names(&drain(&mut events)),
        vec!["RoomTransition", "RoomLoadStarted", "RoomLoadCompleted"]
    );

    in_flight.await.unwrap().unwrap();
    assert!(!engine.is_busy());
    assert_eq!(names(&drain(&mut events)), vec!["RoomEntered"]);
}

// =========================================================================
// Builder contract
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_previous_content_is_torn_down_before_build() {
    let journal = Journal::default();
    let builder = MockBuilder {
        journal: journal.clone(),
        ..MockBuilder::default()
    };
    let (engine, _presenter) = engine_with(abc_graph(), builder, EngineConfig::default());

    engine.load_starting().await.unwrap();
    engine.traverse_door(Direction::East).await.unwrap();
    engine.traverse_door(Direction::West).await.unwrap();

    assert_eq!(
        journal.entries(),
        vec!["build:a", "teardown:a", "build:b", "teardown:b", "build:a"]
    );
    assert_eq!(engine.inspect_container(|rooms| rooms.clone()), vec![id("a")]);
}

#[tokio::test(start_paused = true)]
async fn test_build_fault_still_fades_in_and_settles() {
    let builder = MockBuilder {
        fail_on: Some(id("b")),
        ..MockBuilder::default()
    };
    let (engine, presenter) = engine_with(abc_graph(), builder, EngineConfig::default());
    engine.load_starting().await.unwrap();
    let mut events = engine.subscribe();

    let started = Instant::now();
    let report = engine.traverse_door(Direction::East).await.unwrap();

    assert!(started.elapsed() < engine.config().fade_budget() + Duration::from_millis(50));
    assert_eq!(report.outcome.fault, Some(BuildFault::new("tileset missing")));
    assert_eq!(report.spawn, None);
    assert!(!engine.is_busy());
    assert!(presenter.current_opacity() < 0.01);
    assert_eq!(engine.state().current, Some(id("b")));
    assert_eq!(engine.metrics().build_faults, 1);

    // No load events and no ambient cue for a broken room.
    assert_eq!(names(&drain(&mut events)), vec!["RoomTransition"]);
}

#[tokio::test(start_paused = true)]
async fn test_builder_panic_is_caught_as_fault() {
    let builder = MockBuilder {
        panic_on: Some(id("b")),
        ..MockBuilder::default()
    };
    let (engine, presenter) = engine_with(abc_graph(), builder, EngineConfig::default());
    engine.load_starting().await.unwrap();

    let report = engine.traverse_door(Direction::East).await.unwrap();
    let fault = report.outcome.fault.unwrap();
    assert!(fault.message.contains("hazard spawner exploded"));
    assert!(!engine.is_busy());
    assert_eq!(presenter.current_opacity(), 0.0);

    // The engine is still usable afterwards.
    let report = engine.traverse_door(Direction::West).await.unwrap();
    assert!(report.outcome.succeeded());
}

#[tokio::test(start_paused = true)]
async fn test_teardown_panic_still_moves_to_destination() {
    let builder = MockBuilder {
        panic_on_teardown: Some(id("a")),
        ..MockBuilder::default()
    };
    let journal = builder.journal.clone();
    let (engine, presenter) = engine_with(abc_graph(), builder, EngineConfig::default());
    engine.load_starting().await.unwrap();

    let report = engine.traverse_door(Direction::East).await.unwrap();

    let fault = report.outcome.fault.unwrap();
    assert!(fault.message.contains("despawn of a failed"));
    assert_eq!(report.spawn, None);

    let state = engine.state();
    assert_eq!(state.current, Some(id("b")));
    assert_eq!(state.previous, Some(id("a")));
    assert!(!state.busy);
    assert_eq!(engine.current_room().map(|room| room.id), Some(id("b")));
    assert_eq!(presenter.current_opacity(), 0.0);

    // Build is skipped after a failed teardown.
    assert_eq!(journal.entries(), vec!["build:a", "teardown:a"]);

    // Edges now come from the destination room.
    let report = engine.traverse_door(Direction::West).await.unwrap();
    assert!(report.outcome.succeeded());
    assert_eq!(engine.state().current, Some(id("a")));
}

// =========================================================================
// Post-settle check
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_stuck_overlay_is_force_cleared_after_settle_delay() {
    let (engine, presenter) = engine(abc_graph());
    presenter.stick_after_fade_in.store(true, Ordering::SeqCst);

    let started = Instant::now();
    engine.load_starting().await.unwrap();
    assert_eq!(presenter.current_opacity(), 1.0);

    time::sleep(Duration::from_millis(1100)).await;
    assert!(started.elapsed() < Duration::from_millis(2200));
    assert_eq!(presenter.current_opacity(), 0.0);
    assert_eq!(presenter.force_clears(), 1);
    assert_eq!(engine.metrics().forced_clears, 1);
}

#[tokio::test(start_paused = true)]
async fn test_clean_transition_needs_no_force_clear() {
    let (engine, presenter) = engine(abc_graph());
    engine.load_starting().await.unwrap();
    time::sleep(Duration::from_secs(2)).await;
    assert_eq!(presenter.force_clears(), 0);
    assert_eq!(engine.metrics().forced_clears, 0);
}

#[tokio::test(start_paused = true)]
async fn test_build_fault_with_stuck_overlay_settles_within_two_seconds() {
    let builder = MockBuilder {
        fail_on: Some(id("a")),
        ..MockBuilder::default()
    };
    let (engine, presenter) = engine_with(abc_graph(), builder, EngineConfig::default());
    presenter.stick_after_fade_in.store(true, Ordering::SeqCst);

    let started = Instant::now();
    engine.load_starting().await.unwrap();
    time::sleep(Duration::from_millis(1050)).await;

    assert!(started.elapsed() < Duration::from_millis(2100));
    assert!(!engine.is_busy());
    assert!(presenter.current_opacity() < 0.01);
}

// =========================================================================
// Watchdog integration
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_watchdog_rescues_hung_fade() {
    let (engine, presenter) = engine(abc_graph());
    engine.load_starting().await.unwrap();
    presenter.hang_fade_out.store(true, Ordering::SeqCst);

    let watchdog = Watchdog::new(WatchdogConfig::default(), engine.clone(), TimeScale::new()).spawn();

    let background = engine.clone();
    let _stuck = tokio::spawn(async move { background.traverse_door(Direction::East).await });
    while !engine.is_busy() {
        tokio::task::yield_now().await;
    }

    time::sleep(Duration::from_secs(6)).await;
    assert!(!engine.is_busy());
    assert!(engine.busy_since().is_none());
    assert_eq!(presenter.force_clears(), 1);
    assert_eq!(engine.metrics().forced_settles, 1);
    assert_eq!(engine.state().current, Some(id("a")));

    // The engine accepts new requests again.
    presenter.hang_fade_out.store(false, Ordering::SeqCst);
    engine.traverse_door(Direction::East).await.unwrap();
    assert_eq!(engine.state().current, Some(id("b")));

    let metrics = watchdog.shutdown().await.unwrap();
    assert_eq!(metrics.transitions_settled, 1);
}

#[tokio::test(start_paused = true)]
async fn test_late_resuming_transition_is_superseded() {
    let config = EngineConfig {
        fade_out: Duration::from_secs(10),
        ..EngineConfig::default()
    };
    let (engine, presenter) = engine_with(abc_graph(), MockBuilder::default(), config);

    let background = engine.clone();
    let slow = tokio::spawn(async move { background.load_starting().await });
    while !engine.is_busy() {
        tokio::task::yield_now().await;
    }

    time::sleep(Duration::from_secs(6)).await;
    engine.force_settle();
    assert!(!engine.is_busy());
    assert_eq!(presenter.force_clears(), 1);

    let result = slow.await.unwrap();
    assert_eq!(result.unwrap_err(), NavigationError::Superseded(id("a")));
    assert_eq!(engine.state().current, None);
    assert_eq!(engine.metrics().transitions_completed, 0);
}

#[tokio::test(start_paused = true)]
async fn test_force_settle_when_idle_does_nothing() {
    let (engine, presenter) = engine(abc_graph());
    engine.force_settle();
    assert_eq!(presenter.force_clears(), 0);
    assert_eq!(engine.metrics().forced_settles, 0);
}
