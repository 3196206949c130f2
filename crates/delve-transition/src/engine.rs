//! The transition engine: moves the player from room to room.
//!
//! Every transition runs the same four phases:
//!
//! ```text
//! BeginTransition ──→ SwapRoomContent ──→ EndTransition ──→ PostSettleCheck
//!  busy = true         teardown, build,    fade in,          (spawned, after
//!  RoomTransition      resolve spawn,      busy = false,      settle_delay)
//!  fade out ⏸          load events         RoomEntered ⏸      force clear if
//!                                                             still opaque
//! ```
//!
//! The two fades (⏸) are the only places a transition suspends. Room
//! swapping is synchronous and bounded, and a failing build never stops
//! the fade-in: leaving the screen opaque is worse than showing a
//! half-built room.
//!
//! # Concurrency note
//!
//! The engine is shared by cloning (all clones drive the same state).
//! Locks are held only inside synchronous helpers and never across an
//! `.await`. A request that arrives while a transition is in flight is
//! rejected with [`NavigationError::Busy`]; nothing is queued and nothing
//! is cancelled.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use delve_graph::{Direction, Edge, FloorKind, Position, RoomDefinition, RoomGraph, RoomId};
use delve_watchdog::TransitionMonitor;
use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tracing::{debug, error, info, warn};

use crate::{
    BuildFault, EngineConfig, EngineMetrics, EngineState, NavigationError, Presenter,
    RoomBuilder, RoomEvent, SECRET_SPAWN_PREFIX, START_SPAWN_ID, TransitionOutcome,
    TransitionReport,
};

/// Receiving end of a lifecycle event subscription.
pub type EventReceiver = mpsc::UnboundedReceiver<RoomEvent>;

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

/// The builder, its container, and the handle of the room currently built.
struct Stage<B: RoomBuilder> {
    builder: B,
    container: B::Container,
    built: Option<B::Handle>,
}

impl<B: RoomBuilder> Stage<B> {
    fn teardown_current(&mut self) {
        if let Some(handle) = self.built.take() {
            self.builder.teardown(handle, &mut self.container);
        }
    }

    fn build(&mut self, definition: &RoomDefinition) -> Result<(), BuildFault> {
        let handle = self.builder.build(definition, &mut self.container)?;
        self.built = Some(handle);
        Ok(())
    }
}

struct Core {
    state: EngineState,
    /// Definition of the current room as it was when built. Edge lookups
    /// use this, not the graph, so a re-registration takes effect on the
    /// next visit rather than mid-stay.
    room: Option<RoomDefinition>,
    /// Bumped by every transition start and every watchdog force-settle.
    /// A transition only writes state while its ticket matches.
    epoch: u64,
    metrics: EngineMetrics,
}

/// Everything a running transition carries between phases.
struct Ticket {
    epoch: u64,
    from: Option<RoomId>,
    destination: RoomDefinition,
    spawn_id: String,
}

struct Inner<P: Presenter, B: RoomBuilder> {
    config: EngineConfig,
    graph: Arc<RwLock<RoomGraph>>,
    presenter: Arc<P>,
    stage: Mutex<Stage<B>>,
    core: Mutex<Core>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<RoomEvent>>>,
}

impl<P: Presenter, B: RoomBuilder> Inner<P, B> {
    /// Phase 4. Runs on its own task once the transition has returned.
    fn settle_check(&self) {
        if lock(&self.core).state.busy {
            debug!("post-settle check skipped, another transition is running");
            return;
        }
        let opacity = self.presenter.current_opacity();
        if opacity > self.config.clear_threshold {
            error!(
                opacity,
                threshold = self.config.clear_threshold,
                "overlay still visible after transition settled, forcing clear"
            );
            self.presenter.force_clear();
            lock(&self.core).metrics.forced_clears += 1;
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read(graph: &RwLock<RoomGraph>) -> RwLockReadGuard<'_, RoomGraph> {
    graph.read().unwrap_or_else(PoisonError::into_inner)
}

fn write(graph: &RwLock<RoomGraph>) -> RwLockWriteGuard<'_, RoomGraph> {
    graph.write().unwrap_or_else(PoisonError::into_inner)
}

/// Runs one builder step, turning a panic into a [`BuildFault`].
fn guarded<T>(step: impl FnOnce() -> Result<T, BuildFault>) -> Result<T, BuildFault> {
    match panic::catch_unwind(AssertUnwindSafe(step)) {
        Ok(result) => result,
        Err(payload) => Err(BuildFault::new(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "room builder panicked".to_string()
    }
}

// ---------------------------------------------------------------------------
// RoomRegistrar
// ---------------------------------------------------------------------------

/// Clonable write access to the engine's room graph, for content
/// generators that add rooms while the game runs.
#[derive(Clone)]
pub struct RoomRegistrar {
    graph: Arc<RwLock<RoomGraph>>,
}

impl RoomRegistrar {
    /// Registers (or replaces) a room. Returns `true` if the id was new.
    pub fn register(&self, definition: RoomDefinition) -> bool {
        write(&self.graph).register(definition)
    }

    pub fn contains(&self, id: &RoomId) -> bool {
        read(&self.graph).contains(id)
    }
}

// ---------------------------------------------------------------------------
// TransitionEngine
// ---------------------------------------------------------------------------

/// Drives room transitions over a [`RoomGraph`].
///
/// Dependencies are passed in at construction: the presenter that fades
/// the screen, the builder that constructs room content, and the
/// container the builder places content into.
pub struct TransitionEngine<P: Presenter, B: RoomBuilder> {
    inner: Arc<Inner<P, B>>,
}

impl<P: Presenter, B: RoomBuilder> Clone for TransitionEngine<P, B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: Presenter, B: RoomBuilder> TransitionEngine<P, B> {
    pub fn new(
        graph: RoomGraph,
        presenter: Arc<P>,
        builder: B,
        container: B::Container,
        config: EngineConfig,
    ) -> Self {
        let config = config.validated();
        debug!(
            rooms = graph.len(),
            fade_out_ms = config.fade_out.as_millis() as u64,
            fade_in_ms = config.fade_in.as_millis() as u64,
            "transition engine created"
        );
        Self {
            inner: Arc::new(Inner {
                config,
                graph: Arc::new(RwLock::new(graph)),
                presenter,
                stage: Mutex::new(Stage {
                    builder,
                    container,
                    built: None,
                }),
                core: Mutex::new(Core {
                    state: EngineState::default(),
                    room: None,
                    epoch: 0,
                    metrics: EngineMetrics::default(),
                }),
                subscribers: Mutex::new(Vec::new()),
            }),
        }
    }

    // -- Navigation ---------------------------------------------------------

    /// Loads the starting room: the first room flagged as a start room,
    /// else the first one registered.
    pub async fn load_starting(&self) -> Result<TransitionReport, NavigationError> {
        let start = read(&self.inner.graph)
            .starting_room()
            .map(|room| room.id.clone());
        match start {
            Some(room_id) => self.load_room(room_id, START_SPAWN_ID).await,
            None => {
                error!("cannot load starting room, no rooms are registered");
                Err(NavigationError::NoStartingRoom)
            }
        }
    }

    /// Transitions to `room_id`, placing the player at `spawn_id`.
    ///
    /// Rejected without touching any state if a transition is already
    /// running or the room is not registered.
    pub async fn load_room(
        &self,
        room_id: impl Into<RoomId>,
        spawn_id: impl Into<String>,
    ) -> Result<TransitionReport, NavigationError> {
        let ticket = self.begin(room_id.into(), spawn_id.into())?;
        self.run(ticket).await
    }

    /// Walks through the current room's door in `direction`.
    ///
    /// Arrives at the destination's door on the opposite side, e.g.
    /// leaving east means spawning at `"west_door"`. Lock tokens are not
    /// checked here; see [`door`](Self::door).
    pub async fn traverse_door(
        &self,
        direction: Direction,
    ) -> Result<TransitionReport, NavigationError> {
        let destination =
            self.current_edge(format!("door:{direction}"), |room| room.door(direction))?;
        self.load_room(destination, direction.opposite().spawn_id()).await
    }

    /// Takes the current room's stairs or trapdoor.
    pub async fn traverse_floor(
        &self,
        kind: FloorKind,
    ) -> Result<TransitionReport, NavigationError> {
        let destination =
            self.current_edge(format!("floor:{kind}"), |room| room.floor_edge(kind))?;
        self.load_room(destination, kind.arrival_spawn_id()).await
    }

    /// Takes a secret passage. The caller found the passage and already
    /// knows where it leads, so the destination is passed in directly.
    pub async fn traverse_secret_passage(
        &self,
        kind: &str,
        destination: impl Into<RoomId>,
    ) -> Result<TransitionReport, NavigationError> {
        self.load_room(destination, format!("{SECRET_SPAWN_PREFIX}{kind}"))
            .await
    }

    // -- Queries ------------------------------------------------------------

    /// Snapshot of the engine state.
    pub fn state(&self) -> EngineState {
        lock(&self.inner.core).state.clone()
    }

    pub fn is_busy(&self) -> bool {
        lock(&self.inner.core).state.busy
    }

    /// The definition the current room was built from.
    pub fn current_room(&self) -> Option<RoomDefinition> {
        lock(&self.inner.core).room.clone()
    }

    /// The current room's door edge in `direction`, including its
    /// required key, so a door-interaction handler can decide whether to
    /// consume a key before calling [`traverse_door`](Self::traverse_door).
    pub fn door(&self, direction: Direction) -> Option<Edge> {
        lock(&self.inner.core)
            .room
            .as_ref()
            .and_then(|room| room.door(direction).cloned())
    }

    pub fn metrics(&self) -> EngineMetrics {
        lock(&self.inner.core).metrics.clone()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn presenter(&self) -> &Arc<P> {
        &self.inner.presenter
    }

    /// Subscribes to lifecycle events. Dropped receivers are pruned on
    /// the next event.
    pub fn subscribe(&self) -> EventReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.inner.subscribers).push(tx);
        rx
    }

    // -- Graph access -------------------------------------------------------

    /// Registers (or replaces) a room definition.
    pub fn register(&self, definition: RoomDefinition) -> bool {
        write(&self.inner.graph).register(definition)
    }

    /// A clonable handle for runtime room generators.
    pub fn registrar(&self) -> RoomRegistrar {
        RoomRegistrar {
            graph: Arc::clone(&self.inner.graph),
        }
    }

    /// Runs `f` with read access to the room graph.
    pub fn with_graph<R>(&self, f: impl FnOnce(&RoomGraph) -> R) -> R {
        f(&read(&self.inner.graph))
    }

    /// Runs `f` with read access to the builder's container.
    pub fn inspect_container<R>(&self, f: impl FnOnce(&B::Container) -> R) -> R {
        f(&lock(&self.inner.stage).container)
    }

    // -- Phases -------------------------------------------------------------

    /// Validates the request and claims the busy flag. Either everything
    /// is set up for a transition or nothing changes (besides the
    /// rejection counter).
    fn begin(&self, room_id: RoomId, spawn_id: String) -> Result<Ticket, NavigationError> {
        let mut core = lock(&self.inner.core);
        if core.state.busy {
            core.metrics.rejected += 1;
            warn!(room = %room_id, "transition already in progress, request rejected");
            return Err(NavigationError::Busy);
        }

        let destination = match read(&self.inner.graph).get(&room_id) {
            Ok(definition) => definition.clone(),
            Err(e) => {
                error!(room = %room_id, error = %e, "cannot load room");
                return Err(NavigationError::UnknownRoom(room_id));
            }
        };

        core.epoch += 1;
        core.state.busy = true;
        core.state.transition_started = Some(Instant::now());
        core.metrics.transitions_started += 1;

        Ok(Ticket {
            epoch: core.epoch,
            from: core.state.current.clone(),
            destination,
            spawn_id,
        })
    }

    async fn run(&self, ticket: Ticket) -> Result<TransitionReport, NavigationError> {
        let Ticket {
            epoch,
            from,
            destination,
            spawn_id,
        } = ticket;

        info!(
            from = ?from.as_ref().map(RoomId::as_str),
            to = %destination.id,
            spawn = %spawn_id,
            "room transition started"
        );
        self.emit(RoomEvent::RoomTransition {
            from: from.clone(),
            to: destination.id.clone(),
        });

        self.inner
            .presenter
            .fade_out(self.inner.config.fade_out)
            .await;
        if !self.holds(epoch) {
            warn!(to = %destination.id, "transition superseded during fade-out, abandoning");
            return Err(NavigationError::Superseded(destination.id));
        }

        let (outcome, spawn) = self.swap_room_content(&destination, &spawn_id);

        self.inner
            .presenter
            .fade_in(self.inner.config.fade_in)
            .await;
        if !self.end_transition(epoch) {
            warn!(to = %destination.id, "transition superseded during fade-in");
            return Err(NavigationError::Superseded(destination.id));
        }

        if outcome.succeeded() {
            self.emit(RoomEvent::RoomEntered {
                room: destination.id.clone(),
            });
            info!(room = %destination.id, "room transition completed");
        } else {
            warn!(room = %destination.id, "room transition completed on a faulty room");
        }

        self.schedule_settle_check();

        Ok(TransitionReport {
            from,
            to: destination.id,
            spawn_id,
            spawn,
            outcome,
        })
    }

    /// Phase 2. Never fails: faults end up in the returned outcome.
    fn swap_room_content(
        &self,
        destination: &RoomDefinition,
        spawn_id: &str,
    ) -> (TransitionOutcome, Option<Position>) {
        let built = {
            let mut stage = lock(&self.inner.stage);
            let torn_down = guarded(|| {
                stage.teardown_current();
                Ok(())
            });
            // Entered even on a teardown fault: the old handle is already released.
            self.enter(destination);
            torn_down.and_then(|()| guarded(|| stage.build(destination)))
        };

        match built {
            Ok(()) => {
                let spawn = self.resolve_spawn(destination, spawn_id);
                debug!(room = %destination.id, spawn = %spawn_id, position = %spawn, "spawn resolved");
                self.emit(RoomEvent::RoomLoadStarted {
                    definition: destination.clone(),
                });
                self.emit(RoomEvent::RoomLoadCompleted {
                    definition: destination.clone(),
                    spawn,
                });
                (TransitionOutcome::success(), Some(spawn))
            }
            Err(fault) => {
                lock(&self.inner.core).metrics.build_faults += 1;
                error!(room = %destination.id, error = %fault, "room swap failed, fading in anyway");
                (TransitionOutcome::failed(fault), None)
            }
        }
    }

    /// Makes `destination` the current room.
    fn enter(&self, destination: &RoomDefinition) {
        let mut core = lock(&self.inner.core);
        core.state.previous = core.state.current.replace(destination.id.clone());
        core.room = Some(destination.clone());
    }

    /// Explicit spawn point first, then the default table, then the origin.
    fn resolve_spawn(&self, destination: &RoomDefinition, spawn_id: &str) -> Position {
        match destination.spawn_point(spawn_id) {
            Some(point) => point.position,
            None => self.inner.config.spawn_table.resolve(spawn_id),
        }
    }

    /// Phase 3 bookkeeping. Returns `false` if the watchdog took over.
    fn end_transition(&self, epoch: u64) -> bool {
        let mut core = lock(&self.inner.core);
        if core.epoch != epoch {
            return false;
        }
        core.state.busy = false;
        core.state.transition_started = None;
        core.metrics.transitions_completed += 1;
        true
    }

    fn holds(&self, epoch: u64) -> bool {
        lock(&self.inner.core).epoch == epoch
    }

    fn schedule_settle_check(&self) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            time::sleep(inner.config.settle_delay).await;
            inner.settle_check();
        });
    }

    /// Looks up an existing edge of the current room.
    fn current_edge(
        &self,
        label: String,
        pick: impl FnOnce(&RoomDefinition) -> Option<&Edge>,
    ) -> Result<RoomId, NavigationError> {
        let core = lock(&self.inner.core);
        let Some(room) = core.room.as_ref() else {
            debug!(edge = %label, "no room loaded, nothing to traverse");
            return Err(NavigationError::NoCurrentRoom);
        };
        match pick(room) {
            Some(edge) if edge.is_traversable() => Ok(edge.destination.clone()),
            _ => {
                debug!(room = %room.id, edge = %label, "no such edge, ignoring");
                Err(NavigationError::NoEdge {
                    room: room.id.clone(),
                    edge: label,
                })
            }
        }
    }

    fn emit(&self, event: RoomEvent) {
        debug!(event = event.name(), "room event");
        lock(&self.inner.subscribers).retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl<P: Presenter, B: RoomBuilder> TransitionMonitor for TransitionEngine<P, B> {
    fn busy_since(&self) -> Option<Instant> {
        let core = lock(&self.inner.core);
        if core.state.busy {
            core.state.transition_started
        } else {
            None
        }
    }

    fn force_settle(&self) {
        {
            let mut core = lock(&self.inner.core);
            if !core.state.busy {
                return;
            }
            core.state.busy = false;
            core.state.transition_started = None;
            core.epoch += 1;
            core.metrics.forced_settles += 1;
            warn!(
                room = ?core.state.current.as_ref().map(RoomId::as_str),
                "transition force-settled"
            );
        }
        self.inner.presenter.force_clear();
    }
}
