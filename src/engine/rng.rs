// Seeded random source shared by problem generation and combat

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Game random number generator
///
/// Wraps ChaCha8Rng so a seed fully reproduces a match.
#[derive(Debug, Clone)]
pub struct GameRng {
    rng: ChaCha8Rng,
    seed: u64,
}

impl GameRng {
    /// Create a new RNG with the given seed
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// Create a new RNG with a random seed
    pub fn from_entropy() -> Self {
        Self::new(rand::random())
    }

    /// Get the seed used to create this RNG
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform integer in `min..=max`. Returns `min` when the range is empty.
    pub fn range_inclusive(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        self.rng.gen_range(min..=max)
    }

    /// Uniform float in `[0, 1)`
    pub fn unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}
