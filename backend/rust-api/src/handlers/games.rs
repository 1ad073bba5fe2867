use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::errors::GameError;
use crate::extractors::AppJson;
use crate::middlewares::auth::JwtClaims;
use crate::models::game::{AnswerRequest, AnswerResponse, GameView, HelpResponse};
use crate::models::hint::HelpRequest;
use crate::services::{game_service::ActionOutcome, AppState};

/// Error response: `{ "error", "message", "status" }`, plus the game view when
/// the game itself refused the action.
#[derive(Debug)]
pub struct ApiError {
    error: GameError,
    game: Option<GameView>,
}

impl From<GameError> for ApiError {
    fn from(error: GameError) -> Self {
        Self { error, game: None }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.error.status_code();

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Request failed: {:#}", self.error);
            "Internal server error".to_string()
        } else {
            if self.error.is_rule_violation() {
                tracing::debug!("Game refused action: {}", self.error);
            } else {
                tracing::warn!("Request rejected: {}", self.error);
            }
            self.error.to_string()
        };

        let mut body = json!({
            "error": self.error.code(),
            "message": message,
            "status": status.as_u16(),
        });

        if let GameError::ActiveGameExists {
            game_id: Some(game_id),
        } = &self.error
        {
            body["game_id"] = json!(game_id);
        }

        if let Some(game) = self.game {
            body["game"] = json!(game);
        }

        (status, Json(body)).into_response()
    }
}

/// Splits an action outcome into its value and the view of the stored game.
fn into_parts<T>(outcome: ActionOutcome<T>) -> Result<(T, GameView), ApiError> {
    let view = GameView::from(&outcome.game);
    match outcome.result {
        Ok(value) => Ok((value, view)),
        Err(error) => Err(ApiError {
            error,
            game: Some(view),
        }),
    }
}

pub async fn create_game(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!("Starting game for user_id={}", claims.sub);

    let game = state.games.start_game(claims.user_id()).await?;

    Ok((StatusCode::CREATED, Json(GameView::from(&game))))
}

pub async fn show_game(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(game_id): Path<String>,
) -> Result<Json<GameView>, ApiError> {
    let game = state.games.show_game(claims.user_id(), &game_id).await?;
    Ok(Json(GameView::from(&game)))
}

pub async fn answer(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(game_id): Path<String>,
    AppJson(req): AppJson<AnswerRequest>,
) -> Result<Json<AnswerResponse>, ApiError> {
    let outcome = state
        .games
        .answer(claims.user_id(), &game_id, req.letter)
        .await?;
    let (correct, game) = into_parts(outcome)?;

    Ok(Json(AnswerResponse { correct, game }))
}

pub async fn take_money(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(game_id): Path<String>,
) -> Result<Json<GameView>, ApiError> {
    let outcome = state.games.take_money(claims.user_id(), &game_id).await?;
    let (_, game) = into_parts(outcome)?;

    Ok(Json(game))
}

pub async fn help(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(game_id): Path<String>,
    AppJson(req): AppJson<HelpRequest>,
) -> Result<Json<HelpResponse>, ApiError> {
    let outcome = state
        .games
        .use_hint(claims.user_id(), &game_id, req.help_type)
        .await?;
    let (_, game) = into_parts(outcome)?;

    let help_hash = game
        .current_question
        .as_ref()
        .map(|question| question.help_hash.clone())
        .unwrap_or_default();

    Ok(Json(HelpResponse {
        help_type: req.help_type,
        help_hash,
        game,
    }))
}
