// Answer input buffer: the digits the player has typed for the current turn

/// Maximum number of characters kept in the buffer
const MAX_BUFFER_SIZE: usize = 12;

/// Typed answer for a single turn
///
/// Accepts digits and a single leading minus sign. Anything else is dropped,
/// which keeps `parse` total for every reachable buffer state except the
/// empty one and a lone `-`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AnswerBuffer {
    text: String,
}

impl AnswerBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self {
            text: String::with_capacity(MAX_BUFFER_SIZE),
        }
    }

    /// Append a character. Returns false if it was rejected.
    pub fn push(&mut self, c: char) -> bool {
        if self.text.len() >= MAX_BUFFER_SIZE {
            return false;
        }
        let accepted = c.is_ascii_digit() || (c == '-' && self.text.is_empty());
        if accepted {
            self.text.push(c);
        }
        accepted
    }

    /// Remove the last character
    pub fn backspace(&mut self) {
        self.text.pop();
    }

    /// Clear all typed input
    pub fn clear(&mut self) {
        self.text.clear();
    }

    /// The raw typed text
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Parse the buffer as an integer answer
    pub fn parse(&self) -> Option<i64> {
        parse_answer(&self.text)
    }
}

/// Parse free-form player input as an integer answer
///
/// Surrounding whitespace is ignored; anything that is not a whole integer
/// is `None`.
pub fn parse_answer(input: &str) -> Option<i64> {
    input.trim().parse::<i64>().ok()
}
