// Match lifecycle state

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use super::countdown::Countdown;

/// How a match is played
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Default,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum GameMode {
    /// Untimed, no healing
    #[default]
    Solo,
    /// Per-turn countdown, milestone healing, auto-validation
    Timed,
    /// Untimed, score and actions mirrored to an opponent
    Multiplayer,
}

impl GameMode {
    pub fn is_timed(&self) -> bool {
        *self == Self::Timed
    }

    /// One-line rules summary shown when the mode is selected
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Solo => "SOLO: no healing, manual validation. Press enter to start",
            Self::Timed => "TIMED: beat the clock, healing every 10 streak. Press enter to start",
            Self::Multiplayer => "MULTIPLAYER: race your opponent. Press enter to start",
        }
    }
}

/// Where a match is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    NotStarted,
    /// A problem is on screen waiting for an answer
    InTurn,
    GameOver,
}

/// State of the current match, owned by the combat loop
#[derive(Debug, Clone, Default)]
pub struct MatchState {
    pub(crate) mode: GameMode,
    pub(crate) phase: Phase,
    /// Stats screen open: no match can start
    pub(crate) inspecting: bool,
    /// Only ever `Some` in timed mode during a turn
    pub(crate) countdown: Option<Countdown>,
}

impl MatchState {
    pub fn new(mode: GameMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// A turn is waiting for an answer
    pub fn is_active(&self) -> bool {
        self.phase == Phase::InTurn
    }

    pub fn is_inspecting(&self) -> bool {
        self.inspecting
    }

    /// Time left in the current timed turn
    pub fn remaining_time(&self) -> Option<Duration> {
        self.countdown.as_ref().map(Countdown::remaining)
    }

    /// Budget of the current timed turn
    pub fn max_time_for_turn(&self) -> Option<Duration> {
        self.countdown.as_ref().map(Countdown::max)
    }

    pub fn countdown(&self) -> Option<&Countdown> {
        self.countdown.as_ref()
    }

    /// Drop any pending countdown
    pub(crate) fn cancel_countdown(&mut self) {
        self.countdown = None;
    }
}
