// Player statistics: high scores, best streaks and per-operation progress
//
// Both records are kept per game mode.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use super::combat::GameMode;
use super::problems::OperationKind;

/// Correct answers needed per operation level
pub const ANSWERS_PER_LEVEL: u32 = 10;

/// Progress on one arithmetic operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationStats {
    pub count: u32,
    pub level: u32,
}

impl Default for OperationStats {
    fn default() -> Self {
        Self { count: 0, level: 1 }
    }
}

impl OperationStats {
    fn record(&mut self) {
        self.count += 1;
        self.level = 1 + self.count / ANSWERS_PER_LEVEL;
    }
}

/// Everything the stats screen shows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsSnapshot {
    pub high_scores: BTreeMap<GameMode, u32>,
    pub max_streaks: BTreeMap<GameMode, u32>,
    pub operations: BTreeMap<OperationKind, OperationStats>,
}

impl Default for StatsSnapshot {
    fn default() -> Self {
        Self {
            high_scores: GameMode::iter().map(|m| (m, 0)).collect(),
            max_streaks: GameMode::iter().map(|m| (m, 0)).collect(),
            operations: OperationKind::iter()
                .map(|k| (k, OperationStats::default()))
                .collect(),
        }
    }
}

impl StatsSnapshot {
    pub fn high_score(&self, mode: GameMode) -> u32 {
        self.high_scores.get(&mode).copied().unwrap_or(0)
    }

    pub fn max_streak(&self, mode: GameMode) -> u32 {
        self.max_streaks.get(&mode).copied().unwrap_or(0)
    }

    pub fn operation(&self, kind: OperationKind) -> OperationStats {
        self.operations.get(&kind).copied().unwrap_or_default()
    }

    fn update_high_score(&mut self, mode: GameMode, score: u32) -> bool {
        let best = self.high_scores.entry(mode).or_insert(0);
        if score > *best {
            *best = score;
            true
        } else {
            false
        }
    }

    fn update_max_streak(&mut self, streak: u32, mode: GameMode) -> bool {
        let best = self.max_streaks.entry(mode).or_insert(0);
        if streak > *best {
            *best = streak;
            true
        } else {
            false
        }
    }

    fn register_correct_operation(&mut self, kind: OperationKind) {
        self.operations.entry(kind).or_default().record();
    }
}

/// Stats persistence port used by the combat loop
pub trait StatsStore {
    /// Record a final score; true if it beats the mode's record
    fn update_high_score(&mut self, mode: GameMode, score: u32) -> bool;
    fn register_correct_operation(&mut self, kind: OperationKind);
    fn update_max_streak(&mut self, streak: u32, mode: GameMode);
    fn reset_data(&mut self);
    fn stats(&self) -> StatsSnapshot;
}

/// Stats kept in memory for the lifetime of the process
#[derive(Debug, Default, Clone)]
pub struct MemoryStats {
    data: StatsSnapshot,
}

impl MemoryStats {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatsStore for MemoryStats {
    fn update_high_score(&mut self, mode: GameMode, score: u32) -> bool {
        self.data.update_high_score(mode, score)
    }

    fn register_correct_operation(&mut self, kind: OperationKind) {
        self.data.register_correct_operation(kind);
    }

    fn update_max_streak(&mut self, streak: u32, mode: GameMode) {
        self.data.update_max_streak(streak, mode);
    }

    fn reset_data(&mut self) {
        self.data = StatsSnapshot::default();
    }

    fn stats(&self) -> StatsSnapshot {
        self.data.clone()
    }
}

/// Stats persistence errors
#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Corrupt stats file: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Stats saved as JSON after every change
///
/// Write failures are logged and the in-memory copy stays authoritative.
#[derive(Debug, Clone)]
pub struct JsonStatsStore {
    path: PathBuf,
    data: StatsSnapshot,
}

impl JsonStatsStore {
    /// Open the stats file; a missing file starts from defaults
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StatsError> {
        let path = path.as_ref().to_path_buf();
        let data = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("No stats file at {}, starting fresh", path.display());
                StatsSnapshot::default()
            }
            Err(err) => return Err(err.into()),
        };
        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the current stats to disk
    pub fn save(&self) -> Result<(), StatsError> {
        let text = serde_json::to_string_pretty(&self.data)?;
        fs::write(&self.path, text)?;
        Ok(())
    }

    fn persist(&self) {
        if let Err(err) = self.save() {
            warn!("Failed to save stats to {}: {}", self.path.display(), err);
        }
    }
}

impl StatsStore for JsonStatsStore {
    fn update_high_score(&mut self, mode: GameMode, score: u32) -> bool {
        let record = self.data.update_high_score(mode, score);
        if record {
            self.persist();
        }
        record
    }

    fn register_correct_operation(&mut self, kind: OperationKind) {
        self.data.register_correct_operation(kind);
        self.persist();
    }

    fn update_max_streak(&mut self, streak: u32, mode: GameMode) {
        if self.data.update_max_streak(streak, mode) {
            self.persist();
        }
    }

    fn reset_data(&mut self) {
        self.data = StatsSnapshot::default();
        self.persist();
    }

    fn stats(&self) -> StatsSnapshot {
        self.data.clone()
    }
}
