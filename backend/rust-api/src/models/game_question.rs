use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::hint::{HelpHash, HintKind, HintResult};
use super::hint_engine;
use super::question::Question;

/// Option letter shown to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Letter {
    A,
    B,
    C,
    D,
}

impl Letter {
    pub const ALL: [Letter; 4] = [Letter::A, Letter::B, Letter::C, Letter::D];

    pub fn index(self) -> usize {
        match self {
            Letter::A => 0,
            Letter::B => 1,
            Letter::C => 2,
            Letter::D => 3,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Letter::A => 'a',
            Letter::B => 'b',
            Letter::C => 'c',
            Letter::D => 'd',
        }
    }

    pub fn to_uppercase(self) -> char {
        self.as_char().to_ascii_uppercase()
    }
}

impl std::fmt::Display for Letter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// A question bound into a game, with its letter shuffle and applied hints.
///
/// `permutation[i]` is the answer slot (1..=4) displayed under `Letter::ALL[i]`.
/// The shuffle is drawn once when the game is built and persisted with the
/// question, so every later render shows the same letters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameQuestion {
    pub question: Question,
    pub permutation: [u8; 4],
    #[serde(default)]
    pub help_hash: HelpHash,
}

impl GameQuestion {
    /// Binds a question with an explicit letter permutation. Returns `None`
    /// unless `permutation` is a bijection onto slots 1..=4.
    pub fn new(question: Question, permutation: [u8; 4]) -> Option<Self> {
        let mut sorted = permutation;
        sorted.sort_unstable();
        if sorted != [1, 2, 3, 4] {
            return None;
        }

        Some(Self {
            question,
            permutation,
            help_hash: HelpHash::default(),
        })
    }

    /// Binds a question with a freshly drawn random permutation.
    pub fn shuffled<R: Rng + ?Sized>(question: Question, rng: &mut R) -> Self {
        let mut permutation = [1, 2, 3, 4];
        permutation.shuffle(rng);

        Self {
            question,
            permutation,
            help_hash: HelpHash::default(),
        }
    }

    pub fn level(&self) -> u8 {
        self.question.level
    }

    pub fn text(&self) -> &str {
        &self.question.text
    }

    /// Letter -> answer text, as shown to the player.
    pub fn variants(&self) -> BTreeMap<Letter, String> {
        Letter::ALL
            .iter()
            .zip(self.permutation.iter())
            .filter_map(|(&letter, &slot)| {
                self.question
                    .answer(slot)
                    .map(|text| (letter, text.to_string()))
            })
            .collect()
    }

    /// Letter under which the correct answer is displayed.
    pub fn correct_answer_key(&self) -> Option<Letter> {
        Letter::ALL
            .iter()
            .zip(self.permutation.iter())
            .find(|(_, slot)| **slot == self.question.correct_answer)
            .map(|(&letter, _)| letter)
    }

    pub fn answer_correct(&self, letter: Letter) -> bool {
        self.correct_answer_key() == Some(letter)
    }

    /// Runs a hint against this question and records it in `help_hash`.
    ///
    /// Returns `None` if a hint of this kind is already recorded.
    pub fn add_hint<R: Rng + ?Sized>(&mut self, kind: HintKind, rng: &mut R) -> Option<HintResult> {
        if self.help_hash.contains(kind) {
            return None;
        }

        let correct = self.correct_answer_key()?;
        let variants = self.variants();

        let result = match kind {
            HintKind::FiftyFifty => {
                HintResult::FiftyFifty(hint_engine::fifty_fifty(&variants, correct, rng))
            }
            HintKind::AudienceHelp => {
                HintResult::AudienceHelp(hint_engine::audience_help(&variants, correct, rng))
            }
            HintKind::FriendCall => {
                HintResult::FriendCall(hint_engine::friend_call(&variants, correct, rng))
            }
        };

        self.help_hash.record(result.clone());
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn game_question() -> GameQuestion {
        let question = Question {
            id: "q-1".to_string(),
            level: 0,
            text: "Which planet is known as the red planet?".to_string(),
            answer1: "Mars".to_string(),
            answer2: "Venus".to_string(),
            answer3: "Jupiter".to_string(),
            answer4: "Mercury".to_string(),
            correct_answer: 1,
        };
        // a -> 2, b -> 1, c -> 4, d -> 3
        GameQuestion::new(question, [2, 1, 4, 3]).unwrap()
    }

    #[test]
    fn variants_follow_permutation() {
        let gq = game_question();
        let variants = gq.variants();

        assert_eq!(variants[&Letter::A], gq.question.answer2);
        assert_eq!(variants[&Letter::B], gq.question.answer1);
        assert_eq!(variants[&Letter::C], gq.question.answer4);
        assert_eq!(variants[&Letter::D], gq.question.answer3);
    }

    #[test]
    fn correct_answer_key_tracks_correct_slot() {
        let gq = game_question();
        assert_eq!(gq.correct_answer_key(), Some(Letter::B));
        assert!(gq.answer_correct(Letter::B));
        assert!(!gq.answer_correct(Letter::A));
    }

    #[test]
    fn level_and_text_delegate_to_question() {
        let gq = game_question();
        assert_eq!(gq.level(), gq.question.level);
        assert_eq!(gq.text(), gq.question.text);
    }

    #[test]
    fn rejects_non_bijective_permutation() {
        let gq = game_question();
        assert!(GameQuestion::new(gq.question.clone(), [1, 1, 2, 3]).is_none());
        assert!(GameQuestion::new(gq.question, [0, 1, 2, 3]).is_none());
    }

    #[test]
    fn shuffled_variants_are_a_bijection() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let gq = GameQuestion::shuffled(game_question().question, &mut rng);
            let variants = gq.variants();
            assert_eq!(variants.len(), 4);

            let mut texts: Vec<_> = variants.values().cloned().collect();
            texts.sort();
            let mut expected = vec![
                gq.question.answer1.clone(),
                gq.question.answer2.clone(),
                gq.question.answer3.clone(),
                gq.question.answer4.clone(),
            ];
            expected.sort();
            assert_eq!(texts, expected);

            let key = gq.correct_answer_key().unwrap();
            assert_eq!(variants[&key], "Mars");
        }
    }

    #[test]
    fn audience_help_covers_every_letter() {
        let mut gq = game_question();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(gq.help_hash.audience_help.is_none());

        gq.add_hint(HintKind::AudienceHelp, &mut rng).unwrap();

        let votes = gq.help_hash.audience_help.as_ref().unwrap();
        let keys: Vec<_> = votes.keys().copied().collect();
        assert_eq!(keys, Letter::ALL.to_vec());
    }

    #[test]
    fn fifty_fifty_keeps_correct_answer() {
        let mut gq = game_question();
        let mut rng = StdRng::seed_from_u64(2);

        gq.add_hint(HintKind::FiftyFifty, &mut rng).unwrap();

        let left = gq.help_hash.fifty_fifty.as_ref().unwrap();
        assert_eq!(left.len(), 2);
        assert!(left.contains(&Letter::B));
    }

    #[test]
    fn friend_call_is_recorded_once() {
        let mut gq = game_question();
        let mut rng = StdRng::seed_from_u64(3);

        let first = gq.add_hint(HintKind::FriendCall, &mut rng).unwrap();
        assert!(gq.add_hint(HintKind::FriendCall, &mut rng).is_none());

        let message = gq.help_hash.friend_call.as_ref().unwrap();
        assert!(message.contains(hint_engine::FRIEND_CALL_PHRASE));
        assert_eq!(HintResult::FriendCall(message.clone()), first);
    }

    #[test]
    fn letters_render_and_deserialize() {
        assert_eq!(serde_json::from_str::<Letter>(r#""d""#).unwrap(), Letter::D);
        assert!(serde_json::from_str::<Letter>(r#""e""#).is_err());
        assert_eq!(Letter::C.to_string(), "c");
        assert_eq!(Letter::C.to_uppercase(), 'C');
    }
}
