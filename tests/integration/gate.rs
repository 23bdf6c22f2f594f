//! Method dispatch and origin gate integration tests
//!
//! - OPTIONS answers preflights with 204
//! - Methods other than POST/OPTIONS get 405
//! - A disallowed origin gets a bare 403
//! - Allowed and absent origins proceed with CORS headers

use std::sync::Arc;

use axum::http::{header, Method, StatusCode};
use llm_relay::{AppState, Config};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::common::{
    assert_cors, constants::*, header_str, hello_body, test_server, test_server_with_state,
    with_origin,
};
use crate::mocks::MockUpstream;

const RELAY_PATHS: [&str; 3] = ["/api/anthropic", "/api/openrouter", "/api/openrouter-stream"];

#[tokio::test]
async fn test_preflight_allowed_origin() {
    let server = test_server(Config::default());

    for path in RELAY_PATHS {
        let response = with_origin(server.method(Method::OPTIONS, path), ALLOWED_ORIGIN).await;

        assert_eq!(response.status_code(), StatusCode::NO_CONTENT, "{}", path);
        assert!(response.as_bytes().is_empty());
        assert_cors(&response, ALLOWED_ORIGIN);
    }
}

#[tokio::test]
async fn test_preflight_disallowed_origin_gets_empty_allow_origin() {
    let server = test_server(Config::default());

    let response = with_origin(server.method(Method::OPTIONS, "/api/anthropic"), EVIL_ORIGIN).await;

    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);
    assert_cors(&response, "");
}

#[tokio::test]
async fn test_preflight_without_key_still_succeeds() {
    // Preflight never looks at credentials
    let server = test_server(Config::default());

    let response = server.method(Method::OPTIONS, "/api/openrouter").await;

    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);
    assert_cors(&response, "");
}

#[tokio::test]
async fn test_other_methods_not_allowed() {
    let server = test_server(Config::default());

    for method in [Method::GET, Method::PUT, Method::DELETE, Method::PATCH] {
        let response = with_origin(server.method(method.clone(), "/api/openrouter"), ALLOWED_ORIGIN).await;

        assert_eq!(response.status_code(), StatusCode::METHOD_NOT_ALLOWED, "{}", method);
        assert_eq!(response.json::<Value>(), json!({ "error": "Method not allowed" }));
        assert_cors(&response, ALLOWED_ORIGIN);
    }
}

#[tokio::test]
async fn test_forbidden_origin_has_no_cors_headers() {
    let upstream = MockUpstream::start().await;
    upstream.mock_openrouter_json(200, json!({ "choices": [] })).await;
    let server = test_server(upstream.config());

    for path in RELAY_PATHS {
        let response = with_origin(server.post(path), EVIL_ORIGIN).json(&hello_body()).await;

        assert_eq!(response.status_code(), StatusCode::FORBIDDEN, "{}", path);
        assert_eq!(response.json::<Value>(), json!({ "error": "Forbidden origin" }));
        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_METHODS)
            .is_none());
    }

    assert_eq!(upstream.received_count().await, 0);
}

#[tokio::test]
async fn test_forbidden_origin_checked_before_credentials() {
    let server = test_server(Config::default());

    let response = with_origin(server.post("/api/anthropic"), EVIL_ORIGIN)
        .json(&hello_body())
        .await;

    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_allowed_origin_echoed_on_success() {
    let upstream = MockUpstream::start().await;
    upstream.mock_openrouter_json(200, json!({ "choices": [] })).await;
    let server = test_server(upstream.config());

    let response = with_origin(server.post("/api/openrouter"), ALLOWED_ORIGIN)
        .json(&hello_body())
        .await;

    response.assert_status_ok();
    assert_cors(&response, ALLOWED_ORIGIN);
}

#[tokio::test]
async fn test_missing_origin_proceeds_with_empty_allow_origin() {
    let upstream = MockUpstream::start().await;
    upstream.mock_openrouter_json(200, json!({ "choices": [] })).await;
    let server = test_server(upstream.config());

    let response = server.post("/api/openrouter").json(&hello_body()).await;

    response.assert_status_ok();
    assert_cors(&response, "");
    assert_eq!(upstream.received_count().await, 1);
}

#[tokio::test]
async fn test_preview_suffix_origin_allowed() {
    let upstream = MockUpstream::start().await;
    upstream.mock_openrouter_json(200, json!({ "choices": [] })).await;
    let config = Config {
        preview_origin_suffix: Some(".vercel.app".to_string()),
        ..upstream.config()
    };
    let server = test_server(config);

    let preview = "https://site-git-feature.vercel.app";
    let response = with_origin(server.post("/api/openrouter"), preview)
        .json(&hello_body())
        .await;
    response.assert_status_ok();
    assert_eq!(
        header_str(&response, header::ACCESS_CONTROL_ALLOW_ORIGIN),
        Some(preview)
    );

    let response = with_origin(server.post("/api/openrouter"), "http://site.vercel.app")
        .json(&hello_body())
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_custom_origin_policy() {
    let upstream = MockUpstream::start().await;
    upstream.mock_openrouter_json(200, json!({ "choices": [] })).await;
    let state = AppState::new(upstream.config())
        .unwrap()
        .with_origin_policy(Arc::new(|origin: &str| origin == "https://only.example"));
    let server = test_server_with_state(state);

    let response = with_origin(server.post("/api/openrouter"), "https://only.example")
        .json(&hello_body())
        .await;
    response.assert_status_ok();
    assert_cors(&response, "https://only.example");

    let response = with_origin(server.post("/api/openrouter"), ALLOWED_ORIGIN)
        .json(&hello_body())
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
}
