// Per-turn countdown for timed mode

use std::time::Duration;

use serde::Deserialize;

use crate::common::math::duration_percent;
use crate::engine::timer::Ticker;

/// How long a timed turn lasts and how fast the clock runs down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TimerRules {
    /// Turn budget at streak 0, in seconds
    pub base_secs: u32,
    /// Floor for the turn budget, in seconds
    pub min_secs: u32,
    /// Streak needed to shave one second off the budget
    pub streak_step: u32,
    /// Countdown resolution in milliseconds
    pub tick_ms: u64,
}

/// Stock timed-mode rules: 10s shrinking by 1s every 10 streak, floor 3s
pub const BASE_TIMER: TimerRules = TimerRules {
    base_secs: 10,
    min_secs: 3,
    streak_step: 10,
    tick_ms: 100,
};

impl Default for TimerRules {
    fn default() -> Self {
        BASE_TIMER
    }
}

impl TimerRules {
    /// Turn budget in whole seconds: `max(min, base - streak / step)`
    pub fn budget_secs(&self, streak: u32) -> u32 {
        let shaved = streak.checked_div(self.streak_step).unwrap_or(0);
        self.base_secs.saturating_sub(shaved).max(self.min_secs)
    }

    pub fn turn_budget(&self, streak: u32) -> Duration {
        Duration::from_secs(self.budget_secs(streak) as u64)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }
}

/// A running turn countdown
///
/// Drops by one tick every tick; expired once nothing is left. The budget
/// is at least one tick, so every countdown ends on a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    ticker: Ticker,
    tick: Duration,
    remaining: Duration,
    max: Duration,
}

impl Countdown {
    pub fn new(budget: Duration, tick: Duration) -> Self {
        let ticker = Ticker::new(tick);
        let budget = budget.max(ticker.period());
        Self {
            tick: ticker.period(),
            ticker,
            remaining: budget,
            max: budget,
        }
    }

    /// Time left until the next decrement
    pub fn time_until_tick(&self) -> Duration {
        self.ticker.time_until_fire()
    }

    /// Run the clock on `budget`, stopping at the first decrement.
    /// Returns true if a decrement happened.
    pub fn consume(&mut self, budget: &mut Duration) -> bool {
        if self.is_expired() {
            return false;
        }
        let fired = self.ticker.consume(budget);
        if fired {
            self.remaining = self.remaining.saturating_sub(self.tick);
        }
        fired
    }

    pub fn is_expired(&self) -> bool {
        self.remaining.is_zero()
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    /// Remaining time as a percentage of the turn budget
    pub fn percent(&self) -> f32 {
        duration_percent(self.remaining, self.max)
    }
}
