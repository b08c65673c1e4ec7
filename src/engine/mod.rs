// Engine modules: timing, scheduling, randomness, input

pub mod game_loop;
pub mod input;
pub mod rng;
pub mod timer;
