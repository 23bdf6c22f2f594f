//! Streaming relay integration tests
//!
//! POST /api/openrouter-stream:
//! - 2xx upstream answers are relayed as `text/event-stream`, bytes unchanged
//! - non-2xx upstream answers come back as JSON with the upstream status
//! - the upstream timeout covers the wait for headers, not the stream body

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, StatusCode};
use bytes::Bytes;
use futures::StreamExt;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use llm_relay::{routes::create_router, AppState, Config};

use crate::common::{assert_cors, constants::*, header_str, hello_body, test_server, with_origin};
use crate::mocks::{
    serve, start_chunked_upstream, MockUpstream, CHUNK_DELAY, OPENROUTER_UPSTREAM_PATH,
};

const FRAMES: [&str; 2] = ["data: {\"a\":1}\n\n", "data: {\"b\":2}\n\n"];

#[tokio::test]
async fn test_stream_relayed_with_sse_headers() {
    let upstream = MockUpstream::start().await;
    upstream.mock_openrouter_stream(&FRAMES).await;
    let server = test_server(upstream.config());

    let response = with_origin(server.post("/api/openrouter-stream"), ALLOWED_ORIGIN)
        .json(&hello_body())
        .await;

    response.assert_status_ok();
    assert_eq!(response.text(), FRAMES.concat());
    assert_eq!(
        header_str(&response, header::CONTENT_TYPE),
        Some("text/event-stream")
    );
    assert_eq!(header_str(&response, header::CACHE_CONTROL), Some("no-cache"));
    assert_cors(&response, ALLOWED_ORIGIN);
}

#[tokio::test]
async fn test_stream_flag_sent_upstream() {
    let upstream = MockUpstream::start().await;
    upstream.mock_openrouter_stream(&FRAMES).await;
    let server = test_server(upstream.config());

    server
        .post("/api/openrouter-stream")
        .json(&hello_body())
        .await
        .assert_status_ok();

    let bodies = upstream.received_bodies().await;
    assert_eq!(
        bodies,
        vec![json!({
            "model": "anthropic/claude-sonnet-4",
            "max_tokens": 6000,
            "stream": true,
            "messages": [{ "role": "user", "content": "hi" }]
        })]
    );
}

#[tokio::test]
async fn test_upstream_failure_not_streamed() {
    let upstream = MockUpstream::start().await;
    upstream
        .mock_openrouter_json(429, json!({ "error": "rate limited" }))
        .await;
    let server = test_server(upstream.config());

    let response = with_origin(server.post("/api/openrouter-stream"), ALLOWED_ORIGIN)
        .json(&hello_body())
        .await;

    assert_eq!(response.status_code(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.json::<Value>(), json!({ "error": "rate limited" }));
    assert_eq!(
        header_str(&response, header::CONTENT_TYPE),
        Some("application/json")
    );
    assert_cors(&response, ALLOWED_ORIGIN);
}

#[tokio::test]
async fn test_upstream_failure_with_text_body_wrapped() {
    let upstream = MockUpstream::start().await;
    upstream
        .mock_openrouter_raw(500, "upstream exploded", "text/plain")
        .await;
    let server = test_server(upstream.config());

    let response = server.post("/api/openrouter-stream").json(&hello_body()).await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.json::<Value>(),
        json!({ "error": "upstream exploded" })
    );
}

/// Serve the relay over real HTTP with OpenRouter pointed at `upstream_url`
async fn start_relay(upstream_url: &str, upstream_timeout: Option<Duration>) -> String {
    let config = Config {
        openrouter_api_url: format!("{}{}", upstream_url, OPENROUTER_UPSTREAM_PATH),
        openrouter_api_key: Some(TEST_OPENROUTER_API_KEY.to_string()),
        upstream_timeout,
        ..Config::default()
    };
    let state = Arc::new(AppState::new(config).unwrap());
    serve(create_router(state)).await
}

async fn post_stream(relay_url: &str) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("{}/api/openrouter-stream", relay_url))
        .header(header::ORIGIN, ALLOWED_ORIGIN)
        .json(&hello_body())
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_chunks_arrive_in_order_over_http() {
    let upstream_url = start_chunked_upstream(FRAMES.to_vec()).await;
    let relay_url = start_relay(&upstream_url, None).await;

    let response = post_stream(&relay_url).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
    assert_eq!(response.headers()[header::CONNECTION], "keep-alive");
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        ALLOWED_ORIGIN
    );

    // The upstream pauses between frames, so each one is read separately.
    let received: Vec<Bytes> = response
        .bytes_stream()
        .map(|chunk| chunk.unwrap())
        .collect()
        .await;
    let expected: Vec<Bytes> = FRAMES.iter().map(|frame| Bytes::from_static(frame.as_bytes())).collect();

    assert_eq!(received, expected);
}

#[tokio::test]
async fn test_long_stream_outlives_upstream_timeout() {
    let frames = vec!["data: 1\n\n"; 10];
    let timeout = CHUNK_DELAY * 5;
    let upstream_url = start_chunked_upstream(frames.clone()).await;
    let relay_url = start_relay(&upstream_url, Some(timeout)).await;

    let response = post_stream(&relay_url).await;
    assert_eq!(response.status(), StatusCode::OK);

    let mut received = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        received.extend_from_slice(&chunk.unwrap());
    }

    assert_eq!(received.len(), 90);
    assert_eq!(String::from_utf8(received).unwrap(), frames.concat());
}

#[tokio::test]
async fn test_slow_upstream_headers_are_bad_gateway() {
    let upstream = MockUpstream::start().await;
    upstream
        .mock_openrouter_delayed(Duration::from_millis(500), json!({ "choices": [] }))
        .await;
    let server = test_server(Config {
        upstream_timeout: Some(Duration::from_millis(100)),
        ..upstream.config()
    });

    for path in ["/api/openrouter", "/api/openrouter-stream"] {
        let response = with_origin(server.post(path), ALLOWED_ORIGIN)
            .json(&hello_body())
            .await;

        assert_eq!(response.status_code(), StatusCode::BAD_GATEWAY);
        let body: Value = response.json();
        assert!(body["error"]
            .as_str()
            .unwrap()
            .starts_with("Proxy error: Upstream did not respond"));
        assert_cors(&response, ALLOWED_ORIGIN);
    }
}
