use rand::{seq::IndexedRandom, Rng};
use std::sync::Arc;

use super::game_store::GameStore;
use super::question_source::QuestionSource;
use crate::errors::GameError;
use crate::models::game::Game;
use crate::models::game_question::GameQuestion;
use crate::models::question::{Question, QUESTION_LEVELS};

/// Builds and stores new games.
///
/// Callers check for an unfinished game first; the store's uniqueness
/// constraint is the backstop for concurrent creation.
pub struct GameFactory {
    games: Arc<dyn GameStore>,
    questions: Arc<dyn QuestionSource>,
}

impl GameFactory {
    pub fn new(games: Arc<dyn GameStore>, questions: Arc<dyn QuestionSource>) -> Self {
        Self { games, questions }
    }

    /// Picks one question per level, builds the game and persists it in a
    /// single insert. Nothing is stored when a level has no questions.
    pub async fn create_game_for_user(&self, user_id: &str) -> Result<Game, GameError> {
        let mut candidates = Vec::with_capacity(QUESTION_LEVELS.len());
        for level in QUESTION_LEVELS {
            let questions = self.questions.questions_at_level(level).await?;
            if questions.is_empty() {
                tracing::warn!(level, "No questions available for level");
                return Err(GameError::InsufficientQuestions { level });
            }
            candidates.push(questions);
        }

        let game = assemble_game(user_id, &candidates, &mut rand::rng())?;
        self.games.insert(&game).await?;

        tracing::info!(game_id = %game.id, user_id = %user_id, "Game created");
        Ok(game)
    }
}

/// Builds an unsaved game from per-level candidate lists, where
/// `candidates[i]` holds the questions for level `i`.
pub fn assemble_game<R: Rng + ?Sized>(
    user_id: &str,
    candidates: &[Vec<Question>],
    rng: &mut R,
) -> Result<Game, GameError> {
    let mut game_questions = Vec::with_capacity(QUESTION_LEVELS.len());

    for level in QUESTION_LEVELS {
        let at_level: Vec<&Question> = candidates
            .get(level as usize)
            .map(|questions| questions.iter().filter(|q| q.level == level).collect())
            .unwrap_or_default();

        let question = at_level
            .choose(rng)
            .copied()
            .ok_or(GameError::InsufficientQuestions { level })?;

        game_questions.push(GameQuestion::shuffled(question.clone(), rng));
    }

    Ok(Game::new(user_id, game_questions))
}
