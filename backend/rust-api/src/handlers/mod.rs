use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose, Engine as _};
use serde_json::json;
use std::sync::Arc;

use crate::metrics;
use crate::services::AppState;

type DependencyHealth = serde_json::Map<String, serde_json::Value>;

fn healthy(message: &str) -> DependencyHealth {
    let mut result = serde_json::Map::new();
    result.insert("status".to_string(), json!("healthy"));
    result.insert("message".to_string(), json!(message));
    result
}

fn unhealthy(error: String) -> DependencyHealth {
    let mut result = serde_json::Map::new();
    result.insert("status".to_string(), json!("unhealthy"));
    result.insert("error".to_string(), json!(error));
    result
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut dependencies = serde_json::Map::new();

    let store_health = check_game_store(&state).await;
    let all_healthy = store_health.get("status").and_then(|v| v.as_str()) == Some("healthy");
    dependencies.insert("game_store".to_string(), json!(store_health));

    // Redis only backs rate limiting; losing it degrades nothing else
    let redis_health = check_redis(&state).await;
    dependencies.insert("redis".to_string(), json!(redis_health));

    let (status_code, status) = if all_healthy {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        status_code,
        Json(json!({
            "status": status,
            "service": "millionaire-api",
            "version": env!("CARGO_PKG_VERSION"),
            "dependencies": dependencies
        })),
    )
}

async fn check_game_store(state: &AppState) -> DependencyHealth {
    match tokio::time::timeout(std::time::Duration::from_secs(1), state.games.ping()).await {
        Ok(Ok(())) => healthy("Game store reachable"),
        Ok(Err(e)) => unhealthy(format!("Game store error: {}", e)),
        Err(_) => unhealthy("Game store timeout after 1s".to_string()),
    }
}

async fn check_redis(state: &AppState) -> DependencyHealth {
    let Some(redis) = state.redis.as_ref() else {
        let mut result = serde_json::Map::new();
        result.insert("status".to_string(), json!("disabled"));
        return result;
    };

    let mut conn = redis.clone();
    match tokio::time::timeout(
        std::time::Duration::from_millis(500),
        redis::cmd("PING").query_async::<String>(&mut conn),
    )
    .await
    {
        Ok(Ok(_)) => healthy("Redis connection successful"),
        Ok(Err(e)) => unhealthy(format!("Redis error: {}", e)),
        Err(_) => unhealthy("Redis timeout after 500ms".to_string()),
    }
}

pub async fn metrics_handler() -> impl IntoResponse {
    match metrics::render_metrics() {
        Ok(metrics_text) => (StatusCode::OK, metrics_text),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to render metrics: {}", e),
        ),
    }
}

/// Protects /metrics with HTTP Basic Auth; credentials come from
/// `METRICS_AUTH` as `username:password`.
pub async fn metrics_auth_middleware(
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let encoded = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Basic "))
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let decoded = general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|_| StatusCode::UNAUTHORIZED)?;
    let credentials = String::from_utf8(decoded).map_err(|_| StatusCode::UNAUTHORIZED)?;

    let expected = std::env::var("METRICS_AUTH").unwrap_or_else(|_| "admin:changeme".to_string());

    if credentials != expected {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(request).await)
}

pub mod games;
pub mod users;
