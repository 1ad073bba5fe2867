use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use lazy_static::lazy_static;
use redis::aio::ConnectionManager;
use std::net::SocketAddr;
use std::sync::Arc;

use super::auth::JwtClaims;
use super::metrics::normalize_path;
use crate::metrics::RATE_LIMIT_REJECTIONS_TOTAL;
use crate::services::AppState;

// Requests per window. A game needs ~20 requests end to end.
const RATE_LIMIT_PER_USER: u32 = 60;
const RATE_LIMIT_PER_IP: u32 = 200;
const RATE_WINDOW_SECONDS: u64 = 60;

lazy_static! {
    /// Fixed window counter: first hit creates the key with a TTL, later
    /// hits increment it until the limit.
    static ref RATE_LIMIT_SCRIPT: redis::Script = redis::Script::new(
        r#"
        local key = KEYS[1]
        local limit = tonumber(ARGV[1])
        local window = tonumber(ARGV[2])

        local current = redis.call('GET', key)

        if current == false then
            redis.call('SET', key, 1, 'EX', window)
            return 1
        end

        if tonumber(current) >= limit then
            return 0
        end

        redis.call('INCR', key)
        return 1
        "#
    );
}

fn extract_client_ip_from(headers: &HeaderMap, extensions: &axum::http::Extensions) -> String {
    // Preferred order: X-Forwarded-For, Forwarded, X-Real-IP, ConnectInfo
    if let Some(s) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        // comma separated list; the first entry is the client
        return s.split(',').next().unwrap_or(s).trim().to_string();
    }

    if let Some(s) = headers.get("forwarded").and_then(|v| v.to_str().ok()) {
        // forwarded: for=1.2.3.4; proto=http; by=...
        if let Some(value) = s
            .split(';')
            .map(str::trim)
            .find_map(|part| part.strip_prefix("for="))
        {
            return value.trim().trim_matches('"').to_string();
        }
    }

    if let Some(s) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        return s.trim().to_string();
    }

    if let Some(ci) = extensions.get::<ConnectInfo<SocketAddr>>() {
        return ci.0.ip().to_string();
    }

    "unknown".to_string()
}

fn limit_from_env(name: &str, default: u32) -> u32 {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(default)
}

fn rate_limit_disabled() -> bool {
    std::env::var("RATE_LIMIT_DISABLED").unwrap_or_default() == "1"
}

/// Per-user and per-IP limits for the game routes. Runs after auth so the
/// user id is known. A no-op without Redis.
pub async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(redis) = state.redis.as_ref() else {
        return Ok(next.run(request).await);
    };

    if rate_limit_disabled() {
        tracing::debug!("Rate limiting disabled via RATE_LIMIT_DISABLED=1");
        return Ok(next.run(request).await);
    }

    let client_ip = extract_client_ip_from(request.headers(), request.extensions());
    let user_id = request
        .extensions()
        .get::<JwtClaims>()
        .map(|claims| claims.sub.clone());
    let path = normalize_path(request.uri().path());

    let mut checks = Vec::with_capacity(2);
    if let Some(uid) = &user_id {
        checks.push((
            format!("ratelimit:user:{}", uid),
            limit_from_env("RATE_LIMIT_PER_USER", RATE_LIMIT_PER_USER),
        ));
    }
    checks.push((
        format!("ratelimit:ip:{}", client_ip),
        limit_from_env("RATE_LIMIT_PER_IP", RATE_LIMIT_PER_IP),
    ));

    for (key, limit) in checks {
        let allowed = check_rate_limit(redis, &key, limit, RATE_WINDOW_SECONDS)
            .await
            .map_err(|e| {
                tracing::error!("Rate limit check failed: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            })?;

        if !allowed {
            tracing::warn!(key = %key, "Rate limit exceeded");
            RATE_LIMIT_REJECTIONS_TOTAL.with_label_values(&[&path]).inc();
            return Err(StatusCode::TOO_MANY_REQUESTS);
        }
    }

    Ok(next.run(request).await)
}

async fn check_rate_limit(
    redis: &ConnectionManager,
    key: &str,
    limit: u32,
    window_seconds: u64,
) -> anyhow::Result<bool> {
    let mut conn = redis.clone();

    let allowed: u32 = RATE_LIMIT_SCRIPT
        .key(key)
        .arg(limit)
        .arg(window_seconds)
        .invoke_async(&mut conn)
        .await?;

    Ok(allowed == 1)
}
