// Game modules: characters, combat, problems and the collaborators around them

pub mod characters;
pub mod combat;
pub mod presenter;
pub mod problems;
pub mod relay;
pub mod stats;

use problems::GeneratorError;

/// Errors surfaced by the combat loop and animation state machines
///
/// None of these end the process. Apart from `GeneratorFailure`, each
/// means the request was ignored and nothing changed.
#[derive(Debug, thiserror::Error)]
pub enum CombatError {
    #[error("Invalid answer: {0:?}")]
    InvalidInput(String),

    #[error("Unknown animation: {0}")]
    UnknownAnimation(String),

    #[error("Illegal transition: {0}")]
    IllegalTransition(String),

    #[error("Problem generator failed: {0}")]
    GeneratorFailure(#[from] GeneratorError),
}
