// Character system
//
// This module contains everything related to the fighters on screen:
// - Hero data: health and streak
// - Tuning stats
// - Clip identifiers and their playback rules
// - Animation state machine for sprites

pub mod animation;
pub mod hero;
pub mod state;
pub mod stats;

// Re-export commonly used types
pub use animation::{
    AnimationClip, AnimationState, AnimationStateMachine, ClipLibrary, PlayOutcome,
    DEFAULT_FRAME_PERIOD,
};
pub use hero::Hero;
pub use state::ClipName;
pub use stats::{CharacterStats, BASE_STATS};
