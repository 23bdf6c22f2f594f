//! Upstream provider abstraction
//!
//! Each provider knows its endpoint, where its API key comes from, how the key
//! is attached and how the inbound body is reshaped into its payload.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde_json::{Map, Value};

use crate::error::{RelayError, RelayResult};

/// Token budget used when the caller does not send a usable `max_tokens`
pub const DEFAULT_MAX_TOKENS: u64 = 6000;

/// Inbound chat request, validated just enough to be forwarded
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// Caller-supplied model, forwarded as sent; `None` when falsy
    pub model: Option<Value>,
    /// Caller-supplied budget, forwarded as sent; `None` when falsy
    pub max_tokens: Option<Value>,
    /// Caller-supplied system prompt (string or content blocks)
    pub system: Option<Value>,
    /// Forwarded verbatim
    pub messages: Vec<Value>,
}

impl ChatRequest {
    /// Parse the raw request body.
    ///
    /// A body that is not JSON is handled like a body without `messages`.
    pub fn from_body(body: &[u8]) -> RelayResult<Self> {
        let value: Value = serde_json::from_slice(body).unwrap_or(Value::Null);
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> RelayResult<Self> {
        let Value::Object(mut fields) = value else {
            return Err(RelayError::InvalidMessages);
        };

        let messages = match fields.remove("messages") {
            Some(Value::Array(messages)) => messages,
            _ => return Err(RelayError::InvalidMessages),
        };

        let model = fields.remove("model").filter(is_truthy);
        let max_tokens = fields.remove("max_tokens").filter(is_truthy);
        let system = fields.remove("system").filter(is_truthy);

        Ok(Self {
            model,
            max_tokens,
            system,
            messages,
        })
    }

    /// Role of the first message, for diagnostics
    pub fn first_role(&self) -> Option<&str> {
        self.messages.first()?.get("role")?.as_str()
    }

    /// Length of the first message's content: characters for text, blocks
    /// for structured content
    pub fn first_content_len(&self) -> Option<usize> {
        match self.messages.first()?.get("content")? {
            Value::String(text) => Some(text.chars().count()),
            Value::Array(blocks) => Some(blocks.len()),
            _ => None,
        }
    }
}

/// Null, `false`, zero and the empty string do not count as a supplied value
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => false,
        Value::Number(n) => n.as_f64().map_or(true, |n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// Fields every provider payload starts with
pub fn base_payload(request: &ChatRequest, default_model: &str) -> Map<String, Value> {
    let mut payload = Map::new();
    payload.insert(
        "model".to_string(),
        request
            .model
            .clone()
            .unwrap_or_else(|| Value::from(default_model)),
    );
    payload.insert(
        "max_tokens".to_string(),
        request
            .max_tokens
            .clone()
            .unwrap_or_else(|| Value::from(DEFAULT_MAX_TOKENS)),
    );
    payload.insert(
        "messages".to_string(),
        Value::Array(request.messages.clone()),
    );
    payload
}

/// Trait implemented by every upstream LLM provider
///
/// # Security
///
/// Implementations must attach the key through headers only; it never goes
/// into the JSON payload or into log fields.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &'static str;

    /// Fixed upstream URL
    fn endpoint(&self) -> &str;

    /// Name of the environment variable holding the key
    fn key_variable(&self) -> &'static str;

    /// Key injected at construction time, if configured
    fn api_key(&self) -> Option<&str>;

    /// Model used when the caller does not send one
    fn default_model(&self) -> &str;

    /// Build the upstream JSON payload
    fn build_payload(&self, request: &ChatRequest, streaming: bool) -> Value;

    /// Headers carrying the key and content type
    fn auth_headers(&self, api_key: &str) -> RelayResult<HeaderMap>;

    /// POST the payload to the provider
    async fn send(
        &self,
        client: &reqwest::Client,
        api_key: &str,
        payload: &Value,
    ) -> RelayResult<reqwest::Response> {
        let headers = self.auth_headers(api_key)?;
        let response = client
            .post(self.endpoint())
            .headers(headers)
            .json(payload)
            .send()
            .await?;
        Ok(response)
    }
}
