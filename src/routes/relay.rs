//! Relay endpoints
//!
//! One handler per provider route. All of them share the same gate: method
//! dispatch, origin check, credential check and payload validation, in that
//! order. After the gate the upstream answer is either buffered and returned
//! as JSON or relayed as an SSE byte stream.

use std::sync::Arc;

use anyhow::anyhow;
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tracing::{error, warn};

use crate::{
    cors::CorsHeaders,
    error::{RelayError, RelayResult},
    proxy::{ChatRequest, Provider, RequestContext},
    streaming::relay_chunks,
    AppState,
};

/// Route for the Anthropic Messages API (buffered)
pub const ANTHROPIC_PATH: &str = "/api/anthropic";
/// Route for OpenRouter chat completions (buffered)
pub const OPENROUTER_PATH: &str = "/api/openrouter";
/// Route for OpenRouter chat completions (streamed as SSE)
pub const OPENROUTER_STREAM_PATH: &str = "/api/openrouter-stream";

/// Upper bound on raw upstream text echoed back in a synthetic error
pub const ERROR_TEXT_LIMIT: usize = 500;

/// How the upstream response is returned to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayMode {
    /// Await the full body and return it as JSON
    Buffered,
    /// Announce 200 and forward chunks as they arrive
    Streaming,
}

/// A provider bound to a relay mode and the path it is served on
#[derive(Clone)]
pub struct RelayRoute {
    pub provider: Arc<dyn Provider>,
    pub mode: RelayMode,
    pub path: &'static str,
}

impl RelayRoute {
    pub fn new(provider: Arc<dyn Provider>, mode: RelayMode, path: &'static str) -> Self {
        Self {
            provider,
            mode,
            path,
        }
    }
}

/// `/api/anthropic`
pub async fn anthropic(
    State(state): State<Arc<AppState>>,
    method: Method,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let route = RelayRoute::new(state.anthropic.clone(), RelayMode::Buffered, ANTHROPIC_PATH);
    relay(&state, route, method, &headers, body).await
}

/// `/api/openrouter`
pub async fn openrouter(
    State(state): State<Arc<AppState>>,
    method: Method,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let route = RelayRoute::new(state.openrouter.clone(), RelayMode::Buffered, OPENROUTER_PATH);
    relay(&state, route, method, &headers, body).await
}

/// `/api/openrouter-stream`
pub async fn openrouter_stream(
    State(state): State<Arc<AppState>>,
    method: Method,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let route = RelayRoute::new(
        state.openrouter.clone(),
        RelayMode::Streaming,
        OPENROUTER_STREAM_PATH,
    );
    relay(&state, route, method, &headers, body).await
}

/// Run one request through the gate and the upstream call.
///
/// Every response carries the CORS header set except the 403 sent to a
/// disallowed origin.
pub async fn relay(
    state: &AppState,
    route: RelayRoute,
    method: Method,
    headers: &HeaderMap,
    body: Body,
) -> Response {
    let origin = headers
        .get(header::ORIGIN)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());
    let cors = CorsHeaders::resolve(state.origin_policy.as_ref(), origin.as_deref());

    if method == Method::OPTIONS {
        return (StatusCode::NO_CONTENT, cors.to_header_map()).into_response();
    }

    if method != Method::POST {
        return RelayError::MethodNotAllowed.into_response_with(&cors);
    }

    if cors.is_forbidden() {
        warn!(origin = ?origin, path = %route.path, "Rejected request from forbidden origin");
        return RelayError::ForbiddenOrigin.into_response();
    }

    let ctx = RequestContext::new(route.provider.name(), route.path)
        .with_streaming(route.mode == RelayMode::Streaming);

    match forward(state, &route, body, ctx.clone()).await {
        Ok(mut response) => {
            cors.apply(response.headers_mut());
            response
        }
        Err(err) => {
            match &err {
                RelayError::Http(_) | RelayError::Internal(_) => ctx.log_error(&err.to_string()),
                _ => ctx.log_warning(&err.to_string()),
            }
            err.into_response_with(&cors)
        }
    }
}

/// Credential check, payload validation and the upstream call
async fn forward(
    state: &AppState,
    route: &RelayRoute,
    body: Body,
    ctx: RequestContext,
) -> RelayResult<Response> {
    let provider = route.provider.as_ref();

    let api_key = provider.api_key().ok_or_else(|| {
        error!(
            provider = %provider.name(),
            variable = %provider.key_variable(),
            "API key is not configured"
        );
        RelayError::MissingApiKey(provider.key_variable())
    })?;

    let body = body
        .collect()
        .await
        .map_err(|e| anyhow!("Failed to read request body: {}", e))?
        .to_bytes();

    let request = ChatRequest::from_body(&body)?;
    let streaming = route.mode == RelayMode::Streaming;
    let payload = provider.build_payload(&request, streaming);

    let ctx = ctx.with_model(match &payload["model"] {
        Value::String(model) => model.clone(),
        other => other.to_string(),
    });
    ctx.log_request_shape(
        &payload["max_tokens"],
        request.messages.len(),
        request.first_role(),
        request.first_content_len(),
    );
    ctx.log_upstream_request(provider.endpoint());

    let send = provider.send(&state.http_client, api_key, &payload);
    let upstream = match state.config.upstream_timeout {
        Some(limit) => tokio::time::timeout(limit, send).await.map_err(|_| {
            anyhow!("Upstream did not respond within {}ms", limit.as_millis())
        })??,
        None => send.await?,
    };
    ctx.log_upstream_response(upstream.status().as_u16());

    match route.mode {
        RelayMode::Buffered => buffered_response(upstream, &ctx).await,
        RelayMode::Streaming => streaming_response(upstream, ctx).await,
    }
}

/// Await the whole upstream body and return it with the upstream status
async fn buffered_response(
    upstream: reqwest::Response,
    ctx: &RequestContext,
) -> RelayResult<Response> {
    let status = upstream.status();
    let raw = upstream.bytes().await?;

    let body = match serde_json::from_slice::<Value>(&raw) {
        Ok(parsed) => {
            let (has_choices, choice_count, upstream_error) = describe_body(&parsed);
            ctx.log_buffered_body(has_choices, choice_count, upstream_error.as_deref());
            raw
        }
        Err(e) => {
            ctx.log_warning(&format!("Upstream body is not JSON: {}", e));
            Bytes::from(wrap_raw_text(&raw).to_string())
        }
    };

    Ok(json_response(status, body))
}

/// Open the SSE response, or pass a failed upstream answer through as JSON
async fn streaming_response(
    upstream: reqwest::Response,
    ctx: RequestContext,
) -> RelayResult<Response> {
    let status = upstream.status();

    if !status.is_success() {
        let raw = upstream.bytes().await?;
        let body = serde_json::from_slice::<Value>(&raw).unwrap_or_else(|_| wrap_raw_text(&raw));
        return Err(RelayError::Upstream { status, body });
    }

    ctx.log_stream_started();
    let body = Body::from_stream(relay_chunks(upstream.bytes_stream(), ctx));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .body(body)
        .map_err(|e| RelayError::Internal(anyhow!("Failed to build response: {}", e)))
}

fn json_response(status: StatusCode, body: Bytes) -> Response {
    let mut response = (status, body).into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}

/// Synthetic error object for an upstream body that is not JSON
pub fn wrap_raw_text(raw: &[u8]) -> Value {
    let text = String::from_utf8_lossy(raw);
    json!({ "error": truncate_chars(&text, ERROR_TEXT_LIMIT) })
}

/// Keep at most `max` characters
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Outline of a provider body for logging: choices present, how many, and any
/// embedded error
fn describe_body(body: &Value) -> (bool, Option<usize>, Option<String>) {
    let choices = body.get("choices").or_else(|| body.get("content"));
    let choice_count = choices.and_then(Value::as_array).map(Vec::len);
    let upstream_error = body.get("error").map(|e| match e {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    });

    (choices.is_some(), choice_count, upstream_error)
}
