//! The `RoomBuilder` contract: turning definitions into room content.

use delve_graph::RoomDefinition;

use crate::BuildFault;

/// Constructs a room's content from its definition and tears it down again.
///
/// For every existing door the builder is expected to create a visual and
/// a collider (at the edge's explicit position, else a default offset for
/// the door's side), and one trigger per existing floor edge, secret
/// passage and hazard.
///
/// The engine guarantees that
/// - the previous room's handle is torn down before `build` is called, and
/// - `build` runs exactly once per room swap, with the definition the
///   engine now treats as current.
///
/// The handle is opaque to the engine; it is only kept for `teardown`.
pub trait RoomBuilder: Send + 'static {
    /// Where content gets placed (a scene, a layer, an arena).
    type Container: Send + 'static;

    /// Token for one room's built content.
    type Handle: Send + 'static;

    fn build(
        &mut self,
        definition: &RoomDefinition,
        container: &mut Self::Container,
    ) -> Result<Self::Handle, BuildFault>;

    fn teardown(&mut self, handle: Self::Handle, container: &mut Self::Container);
}
