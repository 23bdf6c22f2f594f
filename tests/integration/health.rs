//! Liveness endpoint integration tests

use axum::http::StatusCode;
use llm_relay::Config;
use serde_json::Value;

use crate::common::test_server;

#[tokio::test]
async fn test_liveness_reports_healthy() {
    let server = test_server(Config::default());

    let response = server.get("/health/live").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["uptime_seconds"].is_u64());
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let server = test_server(Config::default());

    let response = server.get("/api/unknown").await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}
