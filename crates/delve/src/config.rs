//! One configuration document for a whole dungeon.

use delve_scene::{CurtainConfig, SceneLayout};
use delve_transition::EngineConfig;
use delve_watchdog::WatchdogConfig;
use serde::{Deserialize, Serialize};

use crate::DelveError;

/// Settings for every part a [`Dungeon`](crate::Dungeon) assembles.
///
/// Every section is optional in JSON; missing sections use defaults.
///
/// ```json
/// {
///   "engine":   { "fade_out": { "secs": 0, "nanos": 250000000 }, ... },
///   "watchdog": { "busy_timeout": { "secs": 5, "nanos": 0 }, ... },
///   "curtain":  { "steps_per_second": 30 }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DungeonConfig {
    pub engine: EngineConfig,
    pub watchdog: WatchdogConfig,
    pub curtain: CurtainConfig,
    pub layout: SceneLayout,
    /// Spawn the watchdog task when the dungeon starts.
    pub watchdog_enabled: bool,
}

impl Default for DungeonConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            watchdog: WatchdogConfig::default(),
            curtain: CurtainConfig::default(),
            layout: SceneLayout::default(),
            watchdog_enabled: true,
        }
    }
}

impl DungeonConfig {
    pub fn from_json(text: &str) -> Result<Self, DelveError> {
        let config: Self = serde_json::from_str(text)?;
        Ok(config.validated())
    }

    /// Clamps every section.
    pub fn validated(mut self) -> Self {
        self.engine = self.engine.validated();
        self.watchdog = self.watchdog.validated();
        self.curtain = self.curtain.validated();
        self
    }

    pub fn without_watchdog(mut self) -> Self {
        self.watchdog_enabled = false;
        self
    }
}
