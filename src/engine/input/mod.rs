// Input handling
//
// The game only needs one kind of input: the integer answer the player
// types for the current turn.
//
// - `buffer`: typed-answer buffer and answer parsing

pub mod buffer;

pub use buffer::{parse_answer, AnswerBuffer};
