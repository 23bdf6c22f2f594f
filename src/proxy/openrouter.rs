//! OpenRouter chat completions provider

use reqwest::header::HeaderMap;
use serde_json::Value;

use super::headers::bearer_headers;
use super::provider::{base_payload, ChatRequest, Provider};
use crate::config::Config;
use crate::error::RelayResult;

/// OpenRouter aggregator (`POST /api/v1/chat/completions`)
///
/// The key travels as a bearer token. `system` is not part of this API and is
/// dropped; `stream: true` is added only for the streaming route.
#[derive(Debug, Clone)]
pub struct OpenRouterProvider {
    endpoint: String,
    api_key: Option<String>,
    default_model: String,
}

impl OpenRouterProvider {
    pub fn new(config: &Config) -> Self {
        Self {
            endpoint: config.openrouter_api_url.clone(),
            api_key: config.openrouter_api_key.clone(),
            default_model: config.openrouter_default_model.clone(),
        }
    }
}

impl Provider for OpenRouterProvider {
    fn name(&self) -> &'static str {
        "openrouter"
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn key_variable(&self) -> &'static str {
        "OPENROUTER_API_KEY"
    }

    fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    fn build_payload(&self, request: &ChatRequest, streaming: bool) -> Value {
        let mut payload = base_payload(request, self.default_model());
        if streaming {
            payload.insert("stream".to_string(), Value::Bool(true));
        }
        Value::Object(payload)
    }

    fn auth_headers(&self, api_key: &str) -> RelayResult<HeaderMap> {
        bearer_headers(api_key)
    }
}
