use std::sync::Arc;

use crate::config::Config;
use mongodb::Client as MongoClient;
use redis::aio::ConnectionManager;

use self::game_service::GameService;
use self::game_store::{GameStore, MongoGameStore};
use self::question_source::{MongoQuestionSource, QuestionSource};

pub struct AppState {
    pub config: Config,
    pub games: GameService,
    /// `None` disables rate limiting.
    pub redis: Option<ConnectionManager>,
}

impl AppState {
    pub async fn new(
        config: Config,
        mongo_client: MongoClient,
        redis_client: Option<redis::Client>,
    ) -> anyhow::Result<Self> {
        let db = mongo_client.database(&config.mongo_database);

        let game_store = MongoGameStore::new(db.clone());
        game_store.ensure_indexes().await?;
        let question_source = MongoQuestionSource::new(&db);

        let redis = match redis_client {
            Some(client) => Some(connect_redis(client).await?),
            None => {
                tracing::warn!("Redis not configured, rate limiting disabled");
                None
            }
        };

        Ok(Self::with_stores(
            config,
            Arc::new(game_store),
            Arc::new(question_source),
            redis,
        ))
    }

    /// State over arbitrary stores; tests pass in-memory ones.
    pub fn with_stores(
        config: Config,
        games: Arc<dyn GameStore>,
        questions: Arc<dyn QuestionSource>,
        redis: Option<ConnectionManager>,
    ) -> Self {
        Self {
            config,
            games: GameService::new(games, questions),
            redis,
        }
    }
}

async fn connect_redis(client: redis::Client) -> anyhow::Result<ConnectionManager> {
    tracing::info!("Attempting to connect to Redis...");

    let redis = tokio::time::timeout(
        std::time::Duration::from_secs(30),
        ConnectionManager::new(client),
    )
    .await
    .map_err(|_| anyhow::anyhow!("Redis connection timeout after 30s"))??;

    let mut conn = redis.clone();
    tokio::time::timeout(
        std::time::Duration::from_secs(5),
        redis::cmd("PING").query_async::<String>(&mut conn),
    )
    .await
    .map_err(|_| anyhow::anyhow!("Redis PING timeout after 5s"))??;

    tracing::info!("Redis connection established successfully");
    Ok(redis)
}

pub mod game_factory;
pub mod game_service;
pub mod game_store;
pub mod question_source;
