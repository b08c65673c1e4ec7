// Game configuration
//
// Every field has a default, so a config file only lists what it changes:
//
// ```json
// {
//   "stats": { "wrong_answer_damage": 20 },
//   "timer": { "min_secs": 4 },
//   "clip_periods_ms": { "DEATH": 400 }
// }
// ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::game::characters::{CharacterStats, ClipLibrary, ClipName};
use crate::game::combat::TimerRules;

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// All tunables of a game session
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub stats: CharacterStats,
    pub timer: TimerRules,
    /// Frame period for clips without their own, in milliseconds
    pub default_frame_period_ms: u64,
    /// Per-clip frame period overrides, in milliseconds
    pub clip_periods_ms: HashMap<ClipName, u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            stats: CharacterStats::default(),
            timer: TimerRules::default(),
            default_frame_period_ms: 100,
            clip_periods_ms: HashMap::new(),
        }
    }
}

impl GameConfig {
    /// Load a config file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// The knight clip set with this config's frame periods applied
    pub fn clip_library(&self) -> ClipLibrary {
        let mut library = ClipLibrary::knight()
            .with_default_period(Duration::from_millis(self.default_frame_period_ms));
        for (&clip, &period_ms) in &self.clip_periods_ms {
            library.set_period(clip, Duration::from_millis(period_ms));
        }
        library
    }
}
