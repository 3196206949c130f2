//! Error types for the transition layer.

use delve_graph::RoomId;

/// Why a navigation request did not run (or did not finish) a transition.
///
/// None of these are fatal. Every variant is logged where it happens and
/// the engine is left in a consistent, not-busy state (or, for `Busy`,
/// untouched).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    /// Another transition is in flight. Requests are rejected, never queued.
    #[error("a room transition is already in progress")]
    Busy,

    /// The destination id is not registered. Checked before any state
    /// changes, so the engine stays where it was.
    #[error("room {0} is not registered")]
    UnknownRoom(RoomId),

    /// The graph is empty, so there is nowhere to start.
    #[error("no starting room available")]
    NoStartingRoom,

    /// Edge traversal was requested before any room was loaded.
    #[error("no room is loaded")]
    NoCurrentRoom,

    /// The current room has no existing edge in that slot.
    #[error("room {room} has no {edge} edge")]
    NoEdge { room: RoomId, edge: String },

    /// The watchdog force-settled this transition while it was suspended
    /// in a fade; its remaining steps were abandoned.
    #[error("transition to {0} was superseded by a watchdog recovery")]
    Superseded(RoomId),
}

impl NavigationError {
    /// `true` for errors caused by bad room data rather than timing.
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Self::UnknownRoom(_) | Self::NoStartingRoom)
    }
}

/// A failure while constructing (or tearing down) a room's content.
///
/// Caught at the engine boundary and recorded in the transition
/// outcome; the fade-in runs regardless.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("room build failed: {message}")]
pub struct BuildFault {
    pub message: String,
}

impl BuildFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
