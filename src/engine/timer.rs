// Cancellable repeating tasks driven by an external clock
//
// Nothing here owns a thread or a wall clock. An owner keeps at most one
// `Option<Ticker>` per kind of scheduled work; cancelling is setting it to
// `None`, replacing it starts a fresh period.

use std::time::Duration;

/// A repeating task that fires once every `period` of elapsed time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticker {
    period: Duration,
    accumulated: Duration,
}

impl Ticker {
    /// Create a ticker with the given period (a zero period is bumped to 1ms)
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
            accumulated: Duration::ZERO,
        }
    }

    /// Get the firing period
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Time left until the next fire
    pub fn time_until_fire(&self) -> Duration {
        self.period - self.accumulated
    }

    /// Consume time from `budget` until the next fire.
    ///
    /// Returns true when the ticker fired; the time spent reaching the fire
    /// is subtracted from `budget` and the rest is left for the caller to
    /// hand to whatever ticker is active after handling the fire.
    pub fn consume(&mut self, budget: &mut Duration) -> bool {
        let needed = self.time_until_fire();
        if *budget >= needed {
            *budget -= needed;
            self.accumulated = Duration::ZERO;
            true
        } else {
            self.accumulated += *budget;
            *budget = Duration::ZERO;
            false
        }
    }
}
