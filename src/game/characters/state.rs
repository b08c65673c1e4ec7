// Animation clip identifiers and their playback rules

use serde::Deserialize;
use strum::{Display, EnumIter, EnumString};

/// The closed set of clips a character can play
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum ClipName {
    /// Standing still, looping
    Idle,
    /// Default locomotion, looping
    Walk,
    Attack1,
    Attack2,
    Attack3,
    /// Taking damage, returns to walking when done
    Hurt,
    /// Terminal: holds the last frame and blocks further actions
    Death,
}

/// Number of attack variants
pub const ATTACK_VARIANTS: u8 = 3;

impl ClipName {
    /// Looping clips restart at frame 0 instead of finishing
    pub fn is_looping(&self) -> bool {
        matches!(self, Self::Idle | Self::Walk)
    }

    /// One of the attack variants
    pub fn is_attack(&self) -> bool {
        matches!(self, Self::Attack1 | Self::Attack2 | Self::Attack3)
    }

    /// Clips that hand control back to walking once they finish
    pub fn returns_to_walk(&self) -> bool {
        !self.is_looping() && *self != Self::Death
    }

    /// Clips allowed to replace a finished `Death` (used to reset a match)
    pub fn clears_death(&self) -> bool {
        self.is_looping()
    }

    /// Attack variant by its 1-based number
    pub fn attack(variant: u8) -> Option<Self> {
        match variant {
            1 => Some(Self::Attack1),
            2 => Some(Self::Attack2),
            3 => Some(Self::Attack3),
            _ => None,
        }
    }
}
