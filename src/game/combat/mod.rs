// Combat system
//
// One match at a time: problems in, answers and timeouts out, with the hero
// animation and the HUD following along.
//
// - `match_state`: modes, lifecycle phase, the per-turn countdown slot
// - `countdown`: timed-mode turn budget and clock
// - `combat_loop`: the turn loop itself

pub mod combat_loop;
pub mod countdown;
pub mod match_state;

pub use combat_loop::CombatLoop;
pub use countdown::{Countdown, TimerRules, BASE_TIMER};
pub use match_state::{GameMode, MatchState, Phase};

/// Identifies one problem-to-resolution cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TurnId(pub u64);

impl TurnId {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// Why a turn was lost
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    WrongAnswer,
    Timeout,
}

/// How one turn resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    Success { streak: u32, healed: bool },
    Failure { reason: FailureReason, damage: u32 },
}

/// End-of-match summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameOverReport {
    pub mode: GameMode,
    /// Correct answers in the match
    pub score: u32,
    pub new_record: bool,
    /// Record for the mode after this match
    pub high_score: u32,
}

/// A resolved turn and, if it killed the hero, the match summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub turn: TurnId,
    pub outcome: TurnOutcome,
    pub game_over: Option<GameOverReport>,
}

/// What a `CombatLoop::update` call did
///
/// `error` is set when a timeout could not open the next turn. The match
/// is aborted at that point, but the timeouts before it still happened
/// and are all listed.
#[derive(Debug, Default)]
pub struct UpdateReport {
    /// Turns that timed out, in order
    pub resolutions: Vec<Resolution>,
    pub error: Option<crate::game::CombatError>,
}
