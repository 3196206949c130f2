//! Reference collaborators for the Delve transition engine.
//!
//! - [`FadeCurtain`] implements [`Presenter`](delve_transition::Presenter)
//!   as an opacity value ramped over time.
//! - [`SceneBuilder`] implements [`RoomBuilder`](delve_transition::RoomBuilder)
//!   by placing [`Fixture`]s into a [`Scene`].
//!
//! Games with their own renderer and entity system replace both; these
//! are what the demo and the end-to-end tests run on.

mod curtain;
mod scene;

pub use curtain::{CurtainConfig, FadeCurtain};
pub use scene::{
    Collider, ContentCategory, Fixture, FixtureId, Scene, SceneBuilder, SceneHandle, SceneLayout,
};
