use std::sync::Arc;

use super::game_factory::GameFactory;
use super::game_store::{GameStore, HistoryPage};
use super::question_source::QuestionSource;
use crate::errors::GameError;
use crate::metrics::{record_answer, record_game_created, record_game_finished, record_hint};
use crate::models::game::{Game, GameStatus};
use crate::models::game_question::Letter;
use crate::models::hint::{HintKind, HintResult};

/// A state-machine call on a stored game.
///
/// `game` is the game as persisted after the call, also when the call was
/// refused: a refusal can still time the game out.
#[derive(Debug)]
pub struct ActionOutcome<T> {
    pub game: Game,
    pub result: Result<T, GameError>,
}

pub struct GameService {
    games: Arc<dyn GameStore>,
    factory: GameFactory,
}

impl GameService {
    pub fn new(games: Arc<dyn GameStore>, questions: Arc<dyn QuestionSource>) -> Self {
        let factory = GameFactory::new(games.clone(), questions);
        Self { games, factory }
    }

    /// Starts a game unless the user still has one running. A leftover game
    /// whose time ran out is closed first and does not block.
    pub async fn start_game(&self, user_id: &str) -> Result<Game, GameError> {
        if let Some(mut active) = self.games.find_unfinished_game(user_id).await? {
            if !active.time_out() {
                return Err(GameError::ActiveGameExists {
                    game_id: Some(active.id),
                });
            }

            self.games.save(&mut active).await?;
            self.record_finish(&active);
        }

        match self.factory.create_game_for_user(user_id).await {
            Ok(game) => {
                record_game_created();
                Ok(game)
            }
            // Lost a creation race; report the game that won it
            Err(GameError::ActiveGameExists { game_id: None }) => {
                let game_id = self
                    .games
                    .find_unfinished_game(user_id)
                    .await?
                    .map(|game| game.id);
                Err(GameError::ActiveGameExists { game_id })
            }
            Err(e) => Err(e),
        }
    }

    /// Loads a game of `user_id`, closing it if its time ran out.
    pub async fn show_game(&self, user_id: &str, game_id: &str) -> Result<Game, GameError> {
        let mut game = self.owned_game(user_id, game_id).await?;

        if game.time_out() {
            self.games.save(&mut game).await?;
            self.record_finish(&game);
        }

        Ok(game)
    }

    pub async fn answer(
        &self,
        user_id: &str,
        game_id: &str,
        letter: Letter,
    ) -> Result<ActionOutcome<bool>, GameError> {
        let outcome = self
            .run_action(user_id, game_id, move |game| {
                game.answer_current_question(letter)
            })
            .await?;

        if let Ok(correct) = outcome.result {
            record_answer(correct);
            tracing::info!(
                game_id = %game_id,
                letter = %letter,
                correct,
                level = outcome.game.current_level,
                "Answer submitted"
            );
        }

        Ok(outcome)
    }

    pub async fn take_money(
        &self,
        user_id: &str,
        game_id: &str,
    ) -> Result<ActionOutcome<u64>, GameError> {
        self.run_action(user_id, game_id, |game| game.take_money())
            .await
    }

    pub async fn use_hint(
        &self,
        user_id: &str,
        game_id: &str,
        kind: HintKind,
    ) -> Result<ActionOutcome<HintResult>, GameError> {
        let outcome = self
            .run_action(user_id, game_id, move |game| game.apply_hint(kind))
            .await?;

        if outcome.result.is_ok() {
            record_hint(kind);
            tracing::info!(
                game_id = %game_id,
                hint = %kind,
                level = outcome.game.current_level,
                "Hint used"
            );
        }

        Ok(outcome)
    }

    /// Public history of a user, newest first. Expired games are shown as
    /// timed out even before anyone touches them again.
    pub async fn games_for_user(
        &self,
        user_id: &str,
        page: HistoryPage,
    ) -> Result<Vec<Game>, GameError> {
        let mut games = self.games.games_for_user(user_id, page).await?;
        for game in &mut games {
            game.time_out();
        }
        Ok(games)
    }

    pub async fn ping(&self) -> Result<(), GameError> {
        self.games.ping().await
    }

    async fn owned_game(&self, user_id: &str, game_id: &str) -> Result<Game, GameError> {
        let game = self
            .games
            .load(game_id)
            .await?
            .ok_or(GameError::GameNotFound)?;

        if game.user_id != user_id {
            tracing::warn!(game_id = %game_id, user_id = %user_id, "Access to foreign game denied");
            return Err(GameError::Forbidden);
        }

        Ok(game)
    }

    /// Load, apply, persist. The game is saved when the action went through
    /// or when it was refused because time ran out.
    async fn run_action<T, F>(
        &self,
        user_id: &str,
        game_id: &str,
        action: F,
    ) -> Result<ActionOutcome<T>, GameError>
    where
        F: FnOnce(&mut Game) -> Result<T, GameError> + Send,
        T: Send,
    {
        let mut game = self.owned_game(user_id, game_id).await?;
        let was_finished = game.is_finished();

        let result = action(&mut game);

        if result.is_ok() || matches!(result, Err(GameError::TimeExpired)) {
            self.games.save(&mut game).await?;
        }

        if let Err(e) = &result {
            tracing::debug!(game_id = %game_id, error = %e, "Game action refused");
        }

        if !was_finished && game.is_finished() {
            self.record_finish(&game);
        }

        Ok(ActionOutcome { game, result })
    }

    fn record_finish(&self, game: &Game) {
        let status = game.status();
        record_game_finished(status);

        match status {
            GameStatus::Won => {
                tracing::info!(game_id = %game.id, user_id = %game.user_id, prize = game.prize, "Game won")
            }
            GameStatus::Fail => tracing::info!(
                game_id = %game.id,
                user_id = %game.user_id,
                level = game.current_level,
                prize = game.prize,
                "Game failed"
            ),
            GameStatus::Money => tracing::info!(
                game_id = %game.id,
                user_id = %game.user_id,
                prize = game.prize,
                "Player took the money"
            ),
            GameStatus::Timeout => {
                tracing::info!(game_id = %game.id, user_id = %game.user_id, "Game timed out")
            }
            GameStatus::InProgress => {}
        }
    }
}
