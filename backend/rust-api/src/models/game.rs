use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

use super::game_question::{GameQuestion, Letter};
use super::hint::{HelpHash, HintKind, HintResult};
use super::prize;
use super::question::MAX_LEVEL;
use super::{bson_datetime_as_chrono, bson_datetime_as_chrono_option};
use crate::errors::GameError;

/// A game running longer than this is over, whatever the player does.
pub const TIME_LIMIT_MINUTES: i64 = 45;

pub fn time_limit() -> Duration {
    Duration::minutes(TIME_LIMIT_MINUTES)
}

/// Derived from the game's fields on every read; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    InProgress,
    Won,
    Fail,
    Timeout,
    Money,
}

impl GameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::InProgress => "in_progress",
            GameStatus::Won => "won",
            GameStatus::Fail => "fail",
            GameStatus::Timeout => "timeout",
            GameStatus::Money => "money",
        }
    }
}

impl std::fmt::Display for GameStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Game document stored in MongoDB "games" collection, questions embedded.
///
/// `game_questions[i].level() == i` for every game built by the factory.
/// `version` is bumped by the store on every successful save.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    /// Left out of history queries.
    #[serde(default)]
    pub game_questions: Vec<GameQuestion>,
    #[serde(default)]
    pub current_level: u8,
    #[serde(default)]
    pub prize: u64,
    #[serde(default)]
    pub is_failed: bool,
    #[serde(with = "bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "bson_datetime_as_chrono_option")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub used_hints: BTreeSet<HintKind>,
    #[serde(default)]
    pub version: u64,
}

impl Game {
    pub fn new(user_id: impl Into<String>, game_questions: Vec<GameQuestion>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            game_questions,
            current_level: 0,
            prize: 0,
            is_failed: false,
            created_at: Utc::now(),
            finished_at: None,
            used_hints: BTreeSet::new(),
            version: 0,
        }
    }

    pub fn status(&self) -> GameStatus {
        if self.is_failed {
            return GameStatus::Fail;
        }

        if let Some(finished_at) = self.finished_at {
            if finished_at - self.created_at >= time_limit() {
                return GameStatus::Timeout;
            }
        }

        if self.current_level > MAX_LEVEL {
            return GameStatus::Won;
        }

        if self.finished_at.is_some() {
            return GameStatus::Money;
        }

        GameStatus::InProgress
    }

    pub fn is_finished(&self) -> bool {
        self.status() != GameStatus::InProgress
    }

    pub fn current_game_question(&self) -> Option<&GameQuestion> {
        self.game_questions.get(self.current_level as usize)
    }

    pub fn previous_game_question(&self) -> Option<&GameQuestion> {
        (self.current_level as usize)
            .checked_sub(1)
            .and_then(|index| self.game_questions.get(index))
    }

    /// Highest level answered correctly, -1 before the first correct answer.
    pub fn previous_level(&self) -> i32 {
        i32::from(self.current_level) - 1
    }

    pub fn hint_used(&self, kind: HintKind) -> bool {
        self.used_hints.contains(&kind)
    }

    pub fn fifty_fifty_used(&self) -> bool {
        self.hint_used(HintKind::FiftyFifty)
    }

    pub fn audience_help_used(&self) -> bool {
        self.hint_used(HintKind::AudienceHelp)
    }

    pub fn friend_call_used(&self) -> bool {
        self.hint_used(HintKind::FriendCall)
    }

    fn time_expired_at(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at >= time_limit()
    }

    fn deadline(&self) -> DateTime<Utc> {
        self.created_at + time_limit()
    }

    /// Ends an unfinished game whose time ran out. `finished_at` is pinned to
    /// the deadline, not to the moment the expiry was noticed.
    ///
    /// Returns `true` if this call ended the game.
    pub fn time_out(&mut self) -> bool {
        self.time_out_at(Utc::now())
    }

    fn time_out_at(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_finished() || !self.time_expired_at(now) {
            return false;
        }

        self.finished_at = Some(self.deadline());
        true
    }

    /// Checks the game still accepts moves at `now`, timing it out if needed.
    fn ensure_playable(&mut self, now: DateTime<Utc>) -> Result<(), GameError> {
        if self.is_finished() {
            return Err(GameError::GameAlreadyFinished);
        }

        if self.time_out_at(now) {
            return Err(GameError::TimeExpired);
        }

        Ok(())
    }

    /// A move accepted before the deadline must not finish on or after it,
    /// or the game would read as timed out. BSON keeps milliseconds only, so
    /// the stamp stays a full millisecond short of the deadline.
    fn finish(&mut self, prize: u64, failed: bool, now: DateTime<Utc>) {
        let latest = self.deadline() - Duration::milliseconds(1);
        self.prize = prize;
        self.is_failed = failed;
        self.finished_at = Some(now.min(latest));
    }

    /// Answers the current question; returns whether the answer was correct.
    ///
    /// A correct answer only moves the level up. The prize is realized when
    /// the game ends: top prize on a win, fireproof prize on a wrong answer.
    pub fn answer_current_question(&mut self, letter: Letter) -> Result<bool, GameError> {
        let now = Utc::now();
        self.ensure_playable(now)?;

        let correct = self
            .current_game_question()
            .map(|question| question.answer_correct(letter))
            .ok_or(GameError::GameAlreadyFinished)?;

        if correct {
            self.current_level += 1;
            if self.current_level > MAX_LEVEL {
                self.finish(prize::max_prize(), false, now);
            }
        } else {
            self.finish(
                prize::fireproof_prize_below_or_equal(self.previous_level()),
                true,
                now,
            );
        }

        Ok(correct)
    }

    /// Cashes out with the prize of the last level answered correctly.
    pub fn take_money(&mut self) -> Result<u64, GameError> {
        let now = Utc::now();
        self.ensure_playable(now)?;

        let prize = u8::try_from(self.previous_level())
            .ok()
            .and_then(prize::prize_for)
            .unwrap_or(0);

        self.finish(prize, false, now);
        Ok(prize)
    }

    pub fn apply_hint(&mut self, kind: HintKind) -> Result<HintResult, GameError> {
        self.apply_hint_with(kind, &mut rand::rng())
    }

    pub fn apply_hint_with<R: Rng + ?Sized>(
        &mut self,
        kind: HintKind,
        rng: &mut R,
    ) -> Result<HintResult, GameError> {
        self.ensure_playable(Utc::now())?;

        if self.hint_used(kind) {
            return Err(GameError::HintAlreadyUsed(kind));
        }

        let index = self.current_level as usize;
        let question = self
            .game_questions
            .get_mut(index)
            .ok_or(GameError::GameAlreadyFinished)?;
        let result = question
            .add_hint(kind, rng)
            .ok_or(GameError::HintAlreadyUsed(kind))?;

        self.used_hints.insert(kind);
        Ok(result)
    }
}

/// Question as rendered to the player. The correct letter is revealed only
/// once the game is over.
#[derive(Debug, Serialize)]
pub struct GameQuestionView {
    pub level: u8,
    pub text: String,
    pub variants: BTreeMap<Letter, String>,
    pub help_hash: HelpHash,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer_key: Option<Letter>,
}

#[derive(Debug, Serialize)]
pub struct GameView {
    pub id: String,
    pub user_id: String,
    pub status: GameStatus,
    pub finished: bool,
    pub current_level: u8,
    pub previous_level: i32,
    pub prize: u64,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub time_limit_seconds: i64,
    pub fifty_fifty_used: bool,
    pub audience_help_used: bool,
    pub friend_call_used: bool,
    pub current_question: Option<GameQuestionView>,
}

impl From<&Game> for GameView {
    fn from(game: &Game) -> Self {
        let finished = game.is_finished();
        let current_question = game.current_game_question().map(|question| GameQuestionView {
            level: question.level(),
            text: question.text().to_string(),
            variants: question.variants(),
            help_hash: question.help_hash.clone(),
            correct_answer_key: if finished {
                question.correct_answer_key()
            } else {
                None
            },
        });

        GameView {
            id: game.id.clone(),
            user_id: game.user_id.clone(),
            status: game.status(),
            finished,
            current_level: game.current_level,
            previous_level: game.previous_level(),
            prize: game.prize,
            created_at: game.created_at,
            finished_at: game.finished_at,
            time_limit_seconds: time_limit().num_seconds(),
            fifty_fifty_used: game.fifty_fifty_used(),
            audience_help_used: game.audience_help_used(),
            friend_call_used: game.friend_call_used(),
            current_question,
        }
    }
}

/// Row of a user's public game history.
#[derive(Debug, Serialize)]
pub struct GameSummary {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub current_level: u8,
    pub prize: u64,
    pub prize_label: String,
    pub status: GameStatus,
}

impl From<&Game> for GameSummary {
    fn from(game: &Game) -> Self {
        GameSummary {
            id: game.id.clone(),
            created_at: game.created_at,
            current_level: game.current_level,
            prize: game.prize,
            prize_label: prize::format_prize(game.prize),
            status: game.status(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub letter: Letter,
}

#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    pub correct: bool,
    pub game: GameView,
}

#[derive(Debug, Serialize)]
pub struct HelpResponse {
    pub help_type: HintKind,
    pub help_hash: HelpHash,
    pub game: GameView,
}
