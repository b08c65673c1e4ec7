// The player's character: health and answer streak

use crate::common::math::percent;

use super::stats::CharacterStats;

/// The hero of one match
///
/// `current_health` always stays within `0..=max_health`; the hero is dead
/// exactly when it reaches zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hero {
    max_health: u32,
    current_health: u32,
    /// Consecutive correct answers
    streak: u32,
    total_correct: u32,
    total_attempts: u32,
}

impl Hero {
    /// Create a hero at full health
    pub fn new(max_health: u32) -> Self {
        Self {
            max_health,
            current_health: max_health,
            streak: 0,
            total_correct: 0,
            total_attempts: 0,
        }
    }

    /// Create a hero from tuning stats
    pub fn from_stats(stats: &CharacterStats) -> Self {
        Self::new(stats.max_health)
    }

    pub fn max_health(&self) -> u32 {
        self.max_health
    }

    pub fn current_health(&self) -> u32 {
        self.current_health
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn total_correct(&self) -> u32 {
        self.total_correct
    }

    pub fn total_attempts(&self) -> u32 {
        self.total_attempts
    }

    /// Health as a percentage of max health
    pub fn health_percent(&self) -> f32 {
        percent(self.current_health as i64, self.max_health as i64)
    }

    /// Apply damage, never dropping below zero
    pub fn take_damage(&mut self, amount: u32) {
        self.current_health = self.current_health.saturating_sub(amount);
    }

    /// Restore health, never exceeding max health
    pub fn heal(&mut self, amount: u32) {
        self.current_health = self
            .current_health
            .saturating_add(amount)
            .min(self.max_health);
    }

    /// Check if the hero has no health left
    pub fn is_dead(&self) -> bool {
        self.current_health == 0
    }

    /// Record a correct answer
    pub fn register_correct(&mut self) {
        self.total_attempts += 1;
        self.streak += 1;
        self.total_correct += 1;
    }

    /// Record a wrong answer or timeout; the streak is lost
    pub fn register_miss(&mut self) {
        self.total_attempts += 1;
        self.streak = 0;
    }

    /// Back to full health with a clean record
    pub fn reset(&mut self) {
        self.current_health = self.max_health;
        self.streak = 0;
        self.total_correct = 0;
        self.total_attempts = 0;
    }
}

impl Default for Hero {
    fn default() -> Self {
        Self::from_stats(&CharacterStats::default())
    }
}
