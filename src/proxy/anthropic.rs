//! Anthropic Messages API provider

use reqwest::header::HeaderMap;
use serde_json::Value;

use super::headers::anthropic_headers;
use super::provider::{base_payload, ChatRequest, Provider};
use crate::config::Config;
use crate::error::RelayResult;

/// Anthropic native API (`POST /v1/messages`)
///
/// The key travels in `x-api-key`, and `system` is forwarded when present.
/// Requests are always buffered.
#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    endpoint: String,
    api_key: Option<String>,
    version: String,
    default_model: String,
}

impl AnthropicProvider {
    pub fn new(config: &Config) -> Self {
        Self {
            endpoint: config.anthropic_api_url.clone(),
            api_key: config.anthropic_api_key.clone(),
            version: config.anthropic_version.clone(),
            default_model: config.anthropic_default_model.clone(),
        }
    }
}

impl Provider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn key_variable(&self) -> &'static str {
        "ANTHROPIC_API_KEY"
    }

    fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    fn build_payload(&self, request: &ChatRequest, _streaming: bool) -> Value {
        let mut payload = base_payload(request, self.default_model());
        if let Some(system) = &request.system {
            payload.insert("system".to_string(), system.clone());
        }
        Value::Object(payload)
    }

    fn auth_headers(&self, api_key: &str) -> RelayResult<HeaderMap> {
        anthropic_headers(api_key, &self.version)
    }
}
