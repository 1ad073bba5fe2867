use anyhow::Context;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{self, doc, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{FindOptions, IndexOptions};
use mongodb::{Collection, Database, IndexModel};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::errors::GameError;
use crate::metrics::track_db_operation;
use crate::models::game::Game;

pub const GAMES_COLLECTION: &str = "games";

const DUPLICATE_KEY: i32 = 11000;

pub const DEFAULT_HISTORY_LIMIT: u32 = 20;
pub const MAX_HISTORY_LIMIT: u32 = 100;

/// Window into a user's history, newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryPage {
    pub limit: u32,
    pub offset: u64,
}

impl HistoryPage {
    /// Missing values fall back to the defaults; `limit` is clamped to
    /// 1..=MAX_HISTORY_LIMIT.
    pub fn new(limit: Option<u32>, offset: Option<u64>) -> Self {
        Self {
            limit: limit
                .unwrap_or(DEFAULT_HISTORY_LIMIT)
                .clamp(1, MAX_HISTORY_LIMIT),
            offset: offset.unwrap_or(0),
        }
    }
}

impl Default for HistoryPage {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Persistence for games.
///
/// `save` is optimistic: it only succeeds if the stored `version` still
/// equals `game.version`, and bumps `game.version` on success.
#[async_trait]
pub trait GameStore: Send + Sync {
    /// Stores a new game. Fails with `ActiveGameExists` if the user already
    /// has an unfinished game.
    async fn insert(&self, game: &Game) -> Result<(), GameError>;

    async fn save(&self, game: &mut Game) -> Result<(), GameError>;

    async fn load(&self, id: &str) -> Result<Option<Game>, GameError>;

    /// The user's game not finished as of its last save. Its time may
    /// already be up; callers apply `Game::time_out`.
    async fn find_unfinished_game(&self, user_id: &str) -> Result<Option<Game>, GameError>;

    /// One page of a user's games, newest first. The games come without
    /// their questions and are meant for display, never for `save`.
    async fn games_for_user(
        &self,
        user_id: &str,
        page: HistoryPage,
    ) -> Result<Vec<Game>, GameError>;

    async fn ping(&self) -> Result<(), GameError>;
}

pub struct MongoGameStore {
    db: Database,
    games: Collection<Game>,
}

impl MongoGameStore {
    pub fn new(db: Database) -> Self {
        let games = db.collection::<Game>(GAMES_COLLECTION);
        Self { db, games }
    }

    /// Creates the indexes the store relies on. Safe to call on every start.
    pub async fn ensure_indexes(&self) -> anyhow::Result<()> {
        let one_active_game = IndexModel::builder()
            .keys(doc! { "user_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("one_active_game_per_user".to_string())
                    .unique(true)
                    .partial_filter_expression(doc! { "active": true })
                    .build(),
            )
            .build();

        let history = IndexModel::builder()
            .keys(doc! { "user_id": 1, "created_at": -1 })
            .options(
                IndexOptions::builder()
                    .name("user_games_history".to_string())
                    .build(),
            )
            .build();

        self.raw()
            .create_indexes(vec![one_active_game, history])
            .await
            .context("Failed to create games indexes")?;

        tracing::info!("Games collection indexes ensured");
        Ok(())
    }

    fn raw(&self) -> Collection<Document> {
        self.games.clone_with_type::<Document>()
    }

    /// Game as stored, with the `active` flag the unique index filters on.
    fn to_document(game: &Game) -> Result<Document, GameError> {
        let mut document = bson::to_document(game).context("Failed to serialize game")?;
        document.insert("active", !game.is_finished());
        Ok(document)
    }
}

fn is_duplicate_key(err: &anyhow::Error) -> bool {
    let Some(err) = err.downcast_ref::<mongodb::error::Error>() else {
        return false;
    };

    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            write_error.code == DUPLICATE_KEY
        }
        ErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY,
        _ => false,
    }
}

#[async_trait]
impl GameStore for MongoGameStore {
    async fn insert(&self, game: &Game) -> Result<(), GameError> {
        let document = Self::to_document(game)?;
        let raw = self.raw();

        let result = track_db_operation("insert_one", GAMES_COLLECTION, async {
            raw.insert_one(document)
                .await
                .context("Failed to insert game")
        })
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_duplicate_key(&err) => {
                Err(GameError::ActiveGameExists { game_id: None })
            }
            Err(err) => Err(GameError::Storage(err)),
        }
    }

    async fn save(&self, game: &mut Game) -> Result<(), GameError> {
        let expected = game.version;

        let mut next = game.clone();
        next.version = expected + 1;
        let document = Self::to_document(&next)?;
        let raw = self.raw();

        let result = track_db_operation("replace_one", GAMES_COLLECTION, async {
            raw.replace_one(
                doc! { "_id": &game.id, "version": expected as i64 },
                document,
            )
            .await
            .context("Failed to save game")
        })
        .await?;

        if result.matched_count == 0 {
            tracing::warn!(game_id = %game.id, version = expected, "Stale game version on save");
            return Err(GameError::Conflict);
        }

        game.version = next.version;
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<Option<Game>, GameError> {
        let game = track_db_operation("find_one", GAMES_COLLECTION, async {
            self.games
                .find_one(doc! { "_id": id })
                .await
                .context("Failed to load game")
        })
        .await?;

        Ok(game)
    }

    async fn find_unfinished_game(&self, user_id: &str) -> Result<Option<Game>, GameError> {
        let game = track_db_operation("find_one", GAMES_COLLECTION, async {
            self.games
                .find_one(doc! { "user_id": user_id, "active": true })
                .await
                .context("Failed to query unfinished game")
        })
        .await?;

        Ok(game)
    }

    async fn games_for_user(
        &self,
        user_id: &str,
        page: HistoryPage,
    ) -> Result<Vec<Game>, GameError> {
        let games = track_db_operation("find", GAMES_COLLECTION, async {
            let options = FindOptions::builder()
                .sort(doc! { "created_at": -1 })
                .skip(page.offset)
                .limit(i64::from(page.limit))
                .projection(doc! { "game_questions": 0 })
                .build();

            let mut cursor = self
                .games
                .find(doc! { "user_id": user_id })
                .with_options(options)
                .await
                .context("Failed to query user games")?;

            let mut games = Vec::new();
            while let Some(game) = cursor
                .try_next()
                .await
                .context("Failed to iterate user games")?
            {
                games.push(game);
            }
            Ok(games)
        })
        .await?;

        Ok(games)
    }

    async fn ping(&self) -> Result<(), GameError> {
        self.db
            .run_command(doc! { "ping": 1 })
            .await
            .context("MongoDB ping failed")?;
        Ok(())
    }
}

/// Process-local store for tests and runs without MongoDB.
#[derive(Default)]
pub struct InMemoryGameStore {
    games: RwLock<HashMap<String, Game>>,
}

impl InMemoryGameStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GameStore for InMemoryGameStore {
    async fn insert(&self, game: &Game) -> Result<(), GameError> {
        let mut games = self.games.write().await;

        if !game.is_finished() {
            if let Some(active) = games
                .values()
                .find(|stored| stored.user_id == game.user_id && !stored.is_finished())
            {
                return Err(GameError::ActiveGameExists {
                    game_id: Some(active.id.clone()),
                });
            }
        }

        if games.contains_key(&game.id) {
            return Err(GameError::Storage(anyhow::anyhow!(
                "Game {} already stored",
                game.id
            )));
        }

        games.insert(game.id.clone(), game.clone());
        Ok(())
    }

    async fn save(&self, game: &mut Game) -> Result<(), GameError> {
        let mut games = self.games.write().await;

        let stored = games.get_mut(&game.id).ok_or(GameError::GameNotFound)?;
        if stored.version != game.version {
            return Err(GameError::Conflict);
        }

        game.version += 1;
        *stored = game.clone();
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<Option<Game>, GameError> {
        Ok(self.games.read().await.get(id).cloned())
    }

    async fn find_unfinished_game(&self, user_id: &str) -> Result<Option<Game>, GameError> {
        Ok(self
            .games
            .read()
            .await
            .values()
            .find(|game| game.user_id == user_id && !game.is_finished())
            .cloned())
    }

    async fn games_for_user(
        &self,
        user_id: &str,
        page: HistoryPage,
    ) -> Result<Vec<Game>, GameError> {
        let mut games: Vec<Game> = self
            .games
            .read()
            .await
            .values()
            .filter(|game| game.user_id == user_id)
            .cloned()
            .collect();

        games.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let offset = usize::try_from(page.offset).unwrap_or(usize::MAX);
        Ok(games
            .into_iter()
            .skip(offset)
            .take(page.limit as usize)
            .map(|mut game| {
                game.game_questions.clear();
                game
            })
            .collect())
    }

    async fn ping(&self) -> Result<(), GameError> {
        Ok(())
    }
}
