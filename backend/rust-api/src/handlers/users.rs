use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::games::ApiError;
use crate::models::game::GameSummary;
use crate::services::{game_store::HistoryPage, AppState};

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    limit: Option<u32>,
    offset: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct UserGamesResponse {
    pub user_id: String,
    pub limit: u32,
    pub offset: u64,
    pub games: Vec<GameSummary>,
}

/// Game history of any user, newest first.
/// Query parameters:
/// - limit: page size, default 20, at most 100
/// - offset: number of newer games to skip
pub async fn list_user_games(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<UserGamesResponse>, ApiError> {
    let page = HistoryPage::new(query.limit, query.offset);
    let games = state.games.games_for_user(&user_id, page).await?;

    Ok(Json(UserGamesResponse {
        limit: page.limit,
        offset: page.offset,
        games: games.iter().map(GameSummary::from).collect(),
        user_id,
    }))
}
