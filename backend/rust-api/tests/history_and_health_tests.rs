mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use base64::{engine::general_purpose, Engine as _};
use serial_test::serial;
use tower::ServiceExt;

use common::create_test_app;

#[tokio::test]
async fn test_user_history_lists_games_newest_first() {
    let app = create_test_app();

    let first = app.start_game("sam").await;
    app.request(
        "PUT",
        &format!("/api/v1/games/{}/take_money", first),
        Some("sam"),
        None,
    )
    .await;

    let second = app.start_game("sam").await;
    for _ in 0..5 {
        let letter = app.correct_letter(&second).await;
        app.answer("sam", &second, letter).await;
    }
    let wrong = app.wrong_letter(&second).await;
    app.answer("sam", &second, wrong).await;

    // any authenticated user may look at the history
    let (status, body) = app
        .request("GET", "/api/v1/users/sam/games", Some("tina"), None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], "sam");
    let games = body["games"].as_array().unwrap();
    assert_eq!(games.len(), 2);

    assert_eq!(games[0]["id"], second.as_str());
    assert_eq!(games[0]["status"], "fail");
    assert_eq!(games[0]["current_level"], 5);
    assert_eq!(games[0]["prize"], 1000);
    assert_eq!(games[0]["prize_label"], "1 000 ₽");

    assert_eq!(games[1]["id"], first.as_str());
    assert_eq!(games[1]["status"], "money");
    assert_eq!(games[1]["prize_label"], "0 ₽");
}

#[tokio::test]
async fn test_user_history_is_paged() {
    let app = create_test_app();

    let mut ids = Vec::new();
    for _ in 0..3 {
        let id = app.start_game("uma").await;
        app.request(
            "PUT",
            &format!("/api/v1/games/{}/take_money", id),
            Some("uma"),
            None,
        )
        .await;
        ids.push(id);
    }
    ids.reverse();

    let (status, body) = app
        .request("GET", "/api/v1/users/uma/games?limit=2", Some("uma"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["limit"], 2);
    let first: Vec<_> = body["games"]
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["id"].as_str().unwrap().to_string())
        .collect();

    let (_, body) = app
        .request(
            "GET",
            "/api/v1/users/uma/games?limit=2&offset=2",
            Some("uma"),
            None,
        )
        .await;
    let rest: Vec<_> = body["games"]
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["id"].as_str().unwrap().to_string())
        .collect();

    assert_eq!(first, ids[..2].to_vec());
    assert_eq!(rest, ids[2..].to_vec());

    let (_, body) = app
        .request("GET", "/api/v1/users/uma/games?limit=5000", Some("uma"), None)
        .await;
    assert_eq!(body["limit"], 100);
}

#[tokio::test]
async fn test_empty_history() {
    let app = create_test_app();

    let (status, body) = app
        .request("GET", "/api/v1/users/nobody/games", Some("tina"), None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["games"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app();

    let (status, body) = app.request("GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["dependencies"]["game_store"]["status"], "healthy");
    assert_eq!(body["dependencies"]["redis"]["status"], "disabled");
}

#[tokio::test]
async fn test_trace_id_header_is_returned() {
    let app = create_test_app();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-trace-id", "trace-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()["x-trace-id"], "trace-42");
}

#[tokio::test]
#[serial]
async fn test_metrics_requires_basic_auth() {
    std::env::set_var("METRICS_AUTH", "scraper:s3cret");
    let app = create_test_app();

    let (status, _) = app.request("GET", "/metrics", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let credentials = general_purpose::STANDARD.encode("scraper:s3cret");
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .header("authorization", format!("Basic {}", credentials))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("http_requests_total"));

    std::env::remove_var("METRICS_AUTH");
}
