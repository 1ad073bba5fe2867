#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use millionaire_api::{
    config::Config,
    create_router,
    middlewares::auth::{JwtClaims, JwtService},
    models::game_question::Letter,
    services::{
        game_store::{GameStore, InMemoryGameStore},
        question_source::InMemoryQuestionSource,
        AppState,
    },
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub const JWT_SECRET: &str = "integration-test-secret";

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryGameStore>,
}

fn test_config() -> Config {
    Config {
        mongo_uri: "mongodb://unused".to_string(),
        mongo_database: "millionaire_test".to_string(),
        redis_uri: None,
        jwt_secret: JWT_SECRET.to_string(),
        listen_addr: "127.0.0.1:0".to_string(),
    }
}

pub fn create_test_app() -> TestApp {
    create_test_app_with(InMemoryQuestionSource::generated(3))
}

pub fn create_test_app_with(questions: InMemoryQuestionSource) -> TestApp {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let store = Arc::new(InMemoryGameStore::new());
    let state = Arc::new(AppState::with_stores(
        test_config(),
        store.clone(),
        Arc::new(questions),
        None,
    ));

    TestApp {
        router: create_router(state),
        store,
    }
}

pub fn token_for(user_id: &str) -> String {
    JwtService::new(JWT_SECRET)
        .generate_token(&JwtClaims::for_user(user_id, Duration::hours(1)))
        .unwrap()
}

impl TestApp {
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        user_id: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user_id) = user_id {
            builder = builder.header("authorization", format!("Bearer {}", token_for(user_id)));
        }

        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(serde_json::to_vec(&json).unwrap())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, json)
    }

    /// Starts a game and returns its id.
    pub async fn start_game(&self, user_id: &str) -> String {
        let (status, body) = self
            .request("POST", "/api/v1/games", Some(user_id), None)
            .await;
        assert_eq!(status, StatusCode::CREATED, "unexpected body: {}", body);
        body["id"].as_str().unwrap().to_string()
    }

    /// Letter of the correct answer to the game's current question, read
    /// straight from the store.
    pub async fn correct_letter(&self, game_id: &str) -> Letter {
        let game = self.store.load(game_id).await.unwrap().unwrap();
        game.current_game_question()
            .and_then(|question| question.correct_answer_key())
            .unwrap()
    }

    pub async fn wrong_letter(&self, game_id: &str) -> Letter {
        let correct = self.correct_letter(game_id).await;
        *Letter::ALL.iter().find(|&&l| l != correct).unwrap()
    }

    /// Moves the game's start back by `minutes`.
    pub async fn age_game(&self, game_id: &str, minutes: i64) {
        let mut game = self.store.load(game_id).await.unwrap().unwrap();
        game.created_at = Utc::now() - Duration::minutes(minutes);
        self.store.save(&mut game).await.unwrap();
    }

    pub async fn answer(&self, user_id: &str, game_id: &str, letter: Letter) -> (StatusCode, Value) {
        self.request(
            "PUT",
            &format!("/api/v1/games/{}/answer", game_id),
            Some(user_id),
            Some(serde_json::json!({ "letter": letter.to_string() })),
        )
        .await
    }
}
