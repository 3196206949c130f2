//! Engine configuration and the default spawn table.

use std::collections::BTreeMap;
use std::time::Duration;

use delve_graph::Position;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SpawnTable
// ---------------------------------------------------------------------------

/// Fallback arrival positions keyed by spawn id.
///
/// Consulted when the destination room has no explicit spawn point with
/// the requested id. Lookups never fail: unknown ids land on
/// [`Position::ORIGIN`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpawnTable(BTreeMap<String, Position>);

impl SpawnTable {
    /// A table with no entries; every id resolves to the origin.
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    /// Resolves a spawn id to a position.
    pub fn resolve(&self, spawn_id: &str) -> Position {
        self.0.get(spawn_id).copied().unwrap_or(Position::ORIGIN)
    }

    pub fn get(&self, spawn_id: &str) -> Option<Position> {
        self.0.get(spawn_id).copied()
    }

    /// Adds or replaces an entry.
    pub fn insert(&mut self, spawn_id: impl Into<String>, position: Position) {
        self.0.insert(spawn_id.into(), position);
    }

    pub fn with(mut self, spawn_id: impl Into<String>, position: Position) -> Self {
        self.insert(spawn_id, position);
        self
    }
}

impl Default for SpawnTable {
    /// Positions just inside each doorway of a 12x8 room, plus the
    /// stair and trapdoor landings.
    fn default() -> Self {
        Self::empty()
            .with("north_door", Position::new(0.0, 4.0))
            .with("south_door", Position::new(0.0, -4.0))
            .with("east_door", Position::new(6.0, 0.0))
            .with("west_door", Position::new(-6.0, 0.0))
            .with("stairs_up", Position::new(-4.0, 3.0))
            .with("stairs_down", Position::new(4.0, 3.0))
            .with("trapdoor_exit", Position::ORIGIN)
            .with(crate::START_SPAWN_ID, Position::ORIGIN)
    }
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Timing and spawn settings for the transition engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Duration of the fade to opaque before the room swap.
    pub fade_out: Duration,

    /// Duration of the fade back to clear after the swap.
    pub fade_in: Duration,

    /// Real-time delay after a transition before the presenter's opacity
    /// is checked (and force-cleared if a fade got stuck).
    pub settle_delay: Duration,

    /// Opacity above which the post-settle check forces a clear.
    pub clear_threshold: f32,

    /// Fallback arrival positions.
    #[serde(default)]
    pub spawn_table: SpawnTable,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fade_out: Duration::from_millis(500),
            fade_in: Duration::from_millis(500),
            settle_delay: Duration::from_secs(1),
            clear_threshold: 0.01,
            spawn_table: SpawnTable::default(),
        }
    }
}

impl EngineConfig {
    /// Clamp out-of-range values. Called by `TransitionEngine::new`.
    pub fn validated(mut self) -> Self {
        if !(0.0..=1.0).contains(&self.clear_threshold) {
            tracing::warn!(
                threshold = self.clear_threshold,
                "clear_threshold outside 0..=1, clamping"
            );
            self.clear_threshold = if self.clear_threshold.is_nan() {
                0.01
            } else {
                self.clear_threshold.clamp(0.0, 1.0)
            };
        }
        self
    }

    /// Upper bound on how long a transition keeps the screen covered,
    /// ignoring stalls.
    pub fn fade_budget(&self) -> Duration {
        self.fade_out + self.fade_in
    }
}
