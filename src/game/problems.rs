// Arithmetic problem generation

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::engine::rng::GameRng;

/// Arithmetic operation of a problem
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter, Serialize,
    Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum OperationKind {
    Addition,
    Subtraction,
    Multiplication,
    Division,
}

impl OperationKind {
    /// Operator glyph shown to the player
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Addition => "+",
            Self::Subtraction => "-",
            Self::Multiplication => "×",
            Self::Division => "÷",
        }
    }
}

/// One generated problem, alive for a single turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    pub display_text: String,
    pub expected_answer: i64,
    pub operation: OperationKind,
}

impl Problem {
    fn binary(left: i64, op: OperationKind, right: i64, answer: i64) -> Self {
        Self {
            display_text: format!("{left} {} {right}", op.symbol()),
            expected_answer: answer,
            operation: op,
        }
    }
}

/// Problem generation errors
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("Invalid operand range: {min}..={max}")]
    InvalidRange { min: i64, max: i64 },

    #[error("Problem source unavailable: {0}")]
    Unavailable(String),
}

/// Anything that can hand out a problem for the current streak
pub trait ProblemSource {
    /// Generate a problem; a higher streak should mean a harder problem
    fn generate(&mut self, streak: u32) -> Result<Problem, GeneratorError>;
}

/// Inclusive operand range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperandRange {
    pub min: i64,
    pub max: i64,
}

const fn range(min: i64, max: i64) -> OperandRange {
    OperandRange { min, max }
}

/// One possible problem shape within a stage
#[derive(Debug, Clone, Copy)]
struct Slot {
    op: OperationKind,
    operands: OperandRange,
}

const fn slot(op: OperationKind, operands: OperandRange) -> Slot {
    Slot { op, operands }
}

use OperationKind::{Addition, Division, Multiplication, Subtraction};

const STAGE_1: &[Slot] = &[slot(Addition, range(1, 10))];
const STAGE_2: &[Slot] = &[
    slot(Addition, range(10, 50)),
    slot(Subtraction, range(1, 20)),
];
const STAGE_3: &[Slot] = &[
    slot(Addition, range(20, 100)),
    slot(Subtraction, range(10, 50)),
    slot(Multiplication, range(2, 9)),
];
const STAGE_4: &[Slot] = &[
    slot(Addition, range(50, 200)),
    slot(Subtraction, range(50, 200)),
    slot(Multiplication, range(3, 12)),
    slot(Division, range(2, 12)),
];

/// Difficulty stage (1 to 4) for a streak
pub fn difficulty_stage(streak: u32) -> u8 {
    match streak {
        0..=9 => 1,
        10..=19 => 2,
        20..=39 => 3,
        _ => 4,
    }
}

/// Streak-scaled arithmetic generator
///
/// Each stage picks uniformly among its problem shapes. Subtraction puts the
/// larger operand first and division is built from its quotient, so every
/// answer is a non-negative integer.
#[derive(Debug, Clone)]
pub struct MathEngine {
    rng: GameRng,
}

impl MathEngine {
    pub fn new(rng: GameRng) -> Self {
        Self { rng }
    }

    /// Generate a problem of a specific kind
    fn generate_kind(
        &mut self,
        op: OperationKind,
        operands: OperandRange,
    ) -> Result<Problem, GeneratorError> {
        let OperandRange { min, max } = operands;
        let out_of_range = GeneratorError::InvalidRange { min, max };
        if min > max {
            return Err(out_of_range);
        }

        let problem = match op {
            Addition => {
                let a = self.rng.range_inclusive(min, max);
                let b = self.rng.range_inclusive(min, max);
                let sum = a.checked_add(b).ok_or(out_of_range)?;
                Problem::binary(a, op, b, sum)
            }
            Subtraction => {
                let a = self.rng.range_inclusive(min, max);
                let b = self.rng.range_inclusive(min, max);
                let (large, small) = (a.max(b), a.min(b));
                let difference = large.checked_sub(small).ok_or(out_of_range)?;
                Problem::binary(large, op, small, difference)
            }
            Multiplication => {
                let a = self.rng.range_inclusive(min, max);
                let b = self.rng.range_inclusive(min, max);
                let product = a.checked_mul(b).ok_or(out_of_range)?;
                Problem::binary(a, op, b, product)
            }
            Division => {
                let divisor_min = min.max(2);
                if divisor_min > max {
                    return Err(GeneratorError::InvalidRange {
                        min: divisor_min,
                        max,
                    });
                }
                let divisor = self.rng.range_inclusive(divisor_min, max);
                let quotient = self.rng.range_inclusive(min, max);
                let dividend = divisor.checked_mul(quotient).ok_or(out_of_range)?;
                Problem::binary(dividend, op, divisor, quotient)
            }
        };
        Ok(problem)
    }
}

impl ProblemSource for MathEngine {
    fn generate(&mut self, streak: u32) -> Result<Problem, GeneratorError> {
        let slots = match difficulty_stage(streak) {
            1 => STAGE_1,
            2 => STAGE_2,
            3 => STAGE_3,
            _ => STAGE_4,
        };
        let pick = (self.rng.unit() * slots.len() as f64) as usize;
        let chosen = slots[pick.min(slots.len() - 1)];
        self.generate_kind(chosen.op, chosen.operands)
    }
}
