// Hero tuning - the numbers behind damage, healing and health

use serde::Deserialize;

/// Fixed combat numbers for the hero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CharacterStats {
    /// Base health points
    pub max_health: u32,
    /// Health lost on a wrong answer or a timeout
    pub wrong_answer_damage: u32,
    /// Health restored on a streak milestone (timed mode only)
    pub heal_amount: u32,
    /// Streak milestone spacing for the heal
    pub heal_every: u32,
}

/// The stock hero
pub const BASE_STATS: CharacterStats = CharacterStats {
    max_health: 100,
    wrong_answer_damage: 15,
    heal_amount: 20,
    heal_every: 10,
};

impl Default for CharacterStats {
    fn default() -> Self {
        BASE_STATS
    }
}

impl CharacterStats {
    /// Whether reaching `streak` earns the milestone heal
    pub fn is_heal_milestone(&self, streak: u32) -> bool {
        self.heal_every > 0 && streak > 0 && streak % self.heal_every == 0
    }
}
