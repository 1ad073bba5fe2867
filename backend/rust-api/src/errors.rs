use axum::http::StatusCode;
use thiserror::Error;

use crate::models::hint::HintKind;

#[derive(Debug, Error)]
pub enum GameError {
    #[error("No question available for level {level}")]
    InsufficientQuestions { level: u8 },

    #[error("Game is already finished")]
    GameAlreadyFinished,

    #[error("Hint {0} has already been used in this game")]
    HintAlreadyUsed(HintKind),

    #[error("Time limit expired, the game is over")]
    TimeExpired,

    #[error("Game not found")]
    GameNotFound,

    #[error("Game belongs to another user")]
    Forbidden,

    #[error("User already has an unfinished game")]
    ActiveGameExists { game_id: Option<String> },

    #[error("Game was modified by a concurrent request, reload and retry")]
    Conflict,

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl GameError {
    /// Stable machine-readable code for API clients.
    pub fn code(&self) -> &'static str {
        match self {
            GameError::InsufficientQuestions { .. } => "insufficient_questions",
            GameError::GameAlreadyFinished => "game_already_finished",
            GameError::HintAlreadyUsed(_) => "hint_already_used",
            GameError::TimeExpired => "time_expired",
            GameError::GameNotFound => "game_not_found",
            GameError::Forbidden => "forbidden",
            GameError::ActiveGameExists { .. } => "active_game_exists",
            GameError::Conflict => "conflict",
            GameError::Storage(_) => "storage_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            GameError::InsufficientQuestions { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            GameError::GameAlreadyFinished => StatusCode::CONFLICT,
            GameError::HintAlreadyUsed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            GameError::TimeExpired => StatusCode::CONFLICT,
            GameError::GameNotFound => StatusCode::NOT_FOUND,
            GameError::Forbidden => StatusCode::FORBIDDEN,
            GameError::ActiveGameExists { .. } => StatusCode::CONFLICT,
            GameError::Conflict => StatusCode::CONFLICT,
            GameError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Failures the state machine reports as no-ops: the request was valid
    /// but the game refused it.
    pub fn is_rule_violation(&self) -> bool {
        matches!(
            self,
            GameError::GameAlreadyFinished | GameError::HintAlreadyUsed(_) | GameError::TimeExpired
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_and_codes() {
        let err = GameError::HintAlreadyUsed(HintKind::FiftyFifty);
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.code(), "hint_already_used");
        assert_eq!(
            err.to_string(),
            "Hint fifty_fifty has already been used in this game"
        );

        assert_eq!(GameError::TimeExpired.status_code(), StatusCode::CONFLICT);
        assert_eq!(GameError::GameNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            GameError::Storage(anyhow::anyhow!("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn rule_violations() {
        assert!(GameError::TimeExpired.is_rule_violation());
        assert!(GameError::GameAlreadyFinished.is_rule_violation());
        assert!(!GameError::Forbidden.is_rule_violation());
        assert!(!GameError::InsufficientQuestions { level: 3 }.is_rule_violation());
    }
}
