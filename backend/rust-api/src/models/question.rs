use serde::{Deserialize, Serialize};

/// Difficulty levels a game walks through, in order.
pub const QUESTION_LEVELS: std::ops::RangeInclusive<u8> = 0..=14;

/// Highest difficulty level; answering it correctly wins the game.
pub const MAX_LEVEL: u8 = 14;

/// Question bank entry stored in MongoDB "questions" collection.
///
/// `correct_answer` is the 1-based index of the correct slot among
/// `answer1..answer4`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "_id")]
    pub id: String,
    pub level: u8,
    pub text: String,
    pub answer1: String,
    pub answer2: String,
    pub answer3: String,
    pub answer4: String,
    #[serde(default = "default_correct_answer")]
    pub correct_answer: u8,
}

fn default_correct_answer() -> u8 {
    1
}

impl Question {
    /// Answer text for a 1-based slot index.
    pub fn answer(&self, slot: u8) -> Option<&str> {
        match slot {
            1 => Some(&self.answer1),
            2 => Some(&self.answer2),
            3 => Some(&self.answer3),
            4 => Some(&self.answer4),
            _ => None,
        }
    }

    /// A question can be played only if its level is on the ladder and the
    /// correct slot points at one of the four answers.
    pub fn is_well_formed(&self) -> bool {
        QUESTION_LEVELS.contains(&self.level) && (1..=4).contains(&self.correct_answer)
    }
}
