//! Error types for the room graph.

use crate::RoomId;

/// Errors that can occur while storing or looking up rooms.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// No definition is registered under this id. The graph never
    /// creates rooms implicitly.
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// A JSON catalog could not be parsed into room definitions.
    #[error("invalid room catalog: {0}")]
    Catalog(#[from] serde_json::Error),
}
