//! Engine state, transition results, lifecycle events and metrics.

use delve_graph::{Position, RoomDefinition, RoomId};
use tokio::time::Instant;

use crate::BuildFault;

// ---------------------------------------------------------------------------
// EngineState
// ---------------------------------------------------------------------------

/// Where the player is and whether a transition is running.
///
/// Only the engine's own transition sequence and a watchdog
/// force-settle ever write this. Everyone else gets snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EngineState {
    pub current: Option<RoomId>,
    pub previous: Option<RoomId>,
    pub busy: bool,
    /// Real-time instant the in-flight transition began.
    pub transition_started: Option<Instant>,
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Result of the content-swap phase.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransitionOutcome {
    /// Set when the builder failed (or panicked). The fade-in still ran.
    pub fault: Option<BuildFault>,
}

impl TransitionOutcome {
    pub fn success() -> Self {
        Self { fault: None }
    }

    pub fn failed(fault: BuildFault) -> Self {
        Self { fault: Some(fault) }
    }

    pub fn succeeded(&self) -> bool {
        self.fault.is_none()
    }
}

/// What a finished transition did.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionReport {
    pub from: Option<RoomId>,
    pub to: RoomId,
    pub spawn_id: String,
    /// Resolved arrival position. `None` when the build failed before the
    /// spawn could be resolved.
    pub spawn: Option<Position>,
    pub outcome: TransitionOutcome,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Lifecycle notifications for decoupled consumers (player placement,
/// camera, audio, HUD).
#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    /// A transition has begun. Fired once, before the fade-out.
    RoomTransition { from: Option<RoomId>, to: RoomId },

    /// The destination room's content has been built.
    RoomLoadStarted { definition: RoomDefinition },

    /// The room is ready; the player belongs at `spawn`.
    RoomLoadCompleted {
        definition: RoomDefinition,
        spawn: Position,
    },

    /// The fade-in finished on a successfully built room. Ambient cue
    /// (door sound and the like).
    RoomEntered { room: RoomId },
}

impl RoomEvent {
    /// Short name, handy in logs and assertions.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RoomTransition { .. } => "RoomTransition",
            Self::RoomLoadStarted { .. } => "RoomLoadStarted",
            Self::RoomLoadCompleted { .. } => "RoomLoadCompleted",
            Self::RoomEntered { .. } => "RoomEntered",
        }
    }
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Engine counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineMetrics {
    pub transitions_started: u64,
    pub transitions_completed: u64,
    /// Requests turned away because a transition was in flight.
    pub rejected: u64,
    pub build_faults: u64,
    /// Post-settle checks that had to clear a stuck overlay.
    pub forced_clears: u64,
    /// Watchdog recoveries of a stuck busy flag.
    pub forced_settles: u64,
}
