use super::*;
use crate::downloader::test_helpers::{StubFetcher, StubLocator, create_test_downloader_with};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tower::ServiceExt;


/// Test downloader over the given site, wrapped in Arc
fn downloader_for(
    locator: Arc<StubLocator>,
    fetcher: Arc<StubFetcher>,
) -> (Arc<PaperDownloader>, tempfile::TempDir) {
    let (downloader, temp_dir) = create_test_downloader_with(locator, fetcher, 3);
    (Arc::new(downloader), temp_dir)
}

/// Router over the given site using the downloader's own configuration
fn app_for(locator: Arc<StubLocator>) -> (Router, Arc<PaperDownloader>, tempfile::TempDir) {
    let (downloader, temp_dir) = downloader_for(locator, Arc::new(StubFetcher::new()));
    let app = create_router(downloader.clone(), downloader.get_config());
    (app, downloader, temp_dir)
}

/// Site with IGCSE Mathematics (0580) holding two seasons
fn maths_site() -> Arc<StubLocator> {
    let locator = Arc::new(StubLocator::new());
    locator.add_subject("IGCSE", "Mathematics (0580)");
    locator.add_subject("IGCSE", "Physics (0625)");
    locator.add_season("0580", "2023 Oct Nov", 3);
    locator.add_season("0580", "2022 May June", 2);
    locator
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(
        app,
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    (status, json)
}

#[tokio::test]
async fn test_api_server_spawns() {
    let (downloader, _temp_dir) =
        downloader_for(Arc::new(StubLocator::new()), Arc::new(StubFetcher::new()));

    // Port 0 = OS assigns a free port
    let mut config = (*downloader.get_config()).clone();
    config.api.bind_address = "127.0.0.1:0".parse().unwrap();
    let config = Arc::new(config);

    let api_handle = tokio::spawn({
        let downloader = downloader.clone();
        async move { start_api_server(downloader, config).await }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!api_handle.is_finished(), "server exited early");

    api_handle.abort();
}

#[tokio::test]
async fn test_cors_enabled() {
    let (downloader, _temp_dir) =
        downloader_for(Arc::new(StubLocator::new()), Arc::new(StubFetcher::new()));

    let mut config = (*downloader.get_config()).clone();
    config.api.cors_enabled = true;
    config.api.cors_origins = vec!["*".to_string()];
    let app = create_router(downloader, Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let (downloader, _temp_dir) =
        downloader_for(Arc::new(StubLocator::new()), Arc::new(StubFetcher::new()));

    let mut config = (*downloader.get_config()).clone();
    config.api.cors_enabled = false;
    let app = create_router(downloader, Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_swagger_ui_can_be_disabled() {
    let (downloader, _temp_dir) =
        downloader_for(Arc::new(StubLocator::new()), Arc::new(StubFetcher::new()));

    let mut config = (*downloader.get_config()).clone();
    config.api.swagger_ui = false;
    let app = create_router(downloader, Arc::new(config));

    let (status, _) = get(&app, "/api-docs/openapi.json").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_swagger_ui_serves_spec_when_enabled() {
    let (app, _downloader, _temp_dir) = app_for(Arc::new(StubLocator::new()));

    let (status, body) = get(&app, "/api-docs/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/downloads/bulk"].is_object());
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let (app, _downloader, _temp_dir) = app_for(Arc::new(StubLocator::new()));

    let (status, _) = get(&app, "/queue").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
