/// Game loop timing and control
///
/// Converts wall-clock time into a whole number of fixed steps so the
/// combat loop and animation tickers always advance by the same quantum.
use std::time::{Duration, Instant};

/// Fixed simulation step (100 updates per second)
pub const FIXED_TIMESTEP: Duration = Duration::from_millis(10);

/// Maximum number of steps per frame so a stalled terminal can't flood the game
const MAX_STEPS_PER_FRAME: u32 = 50;

/// Game loop timing state
pub struct GameLoop {
    /// Accumulated time not yet converted into steps
    accumulator: Duration,

    /// Time of last frame
    last_frame_time: Instant,

    /// Time when game loop started
    start_time: Instant,

    /// Whether the game is paused
    paused: bool,

    /// Current frame number
    frame_count: u64,

    /// Total steps handed out
    update_count: u64,
}

impl GameLoop {
    /// Create a new game loop
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            accumulator: Duration::ZERO,
            last_frame_time: now,
            start_time: now,
            paused: false,
            frame_count: 0,
            update_count: 0,
        }
    }

    /// Begin a new frame, returns the number of fixed steps to run
    pub fn begin_frame(&mut self) -> u32 {
        let now = Instant::now();
        let frame_time = now.duration_since(self.last_frame_time);
        self.last_frame_time = now;
        self.advance(frame_time)
    }

    /// Feed `frame_time` of elapsed time, returns the number of fixed steps to run
    pub fn advance(&mut self, frame_time: Duration) -> u32 {
        self.frame_count += 1;

        if self.paused {
            return 0;
        }

        self.accumulator += frame_time;

        let mut steps = 0;
        while self.accumulator >= FIXED_TIMESTEP && steps < MAX_STEPS_PER_FRAME {
            self.accumulator -= FIXED_TIMESTEP;
            steps += 1;
        }

        // Drop the backlog we refused to simulate
        if steps == MAX_STEPS_PER_FRAME {
            self.accumulator = Duration::ZERO;
        }

        self.update_count += steps as u64;
        steps
    }

    /// Get total elapsed time since start
    pub fn elapsed(&self) -> Duration {
        Instant::now().duration_since(self.start_time)
    }

    /// Get total number of frames begun
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Get total number of steps handed out
    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    /// Check if game is paused
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Pause the game
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            log::info!("Game paused");
        }
    }

    /// Resume the game
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            // Reset accumulator to prevent update burst
            self.accumulator = Duration::ZERO;
            self.last_frame_time = Instant::now();
            log::info!("Game resumed");
        }
    }
}

impl Default for GameLoop {
    fn default() -> Self {
        Self::new()
    }
}
