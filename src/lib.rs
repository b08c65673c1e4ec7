// Math Arena: answer arithmetic problems to fight

pub mod common;
pub mod config;
pub mod engine;
pub mod game;

pub use config::GameConfig;
pub use game::combat::{CombatLoop, GameMode, Phase};
pub use game::CombatError;
