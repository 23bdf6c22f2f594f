//! Configuration management for the relay
//!
//! Configuration is loaded from environment variables once at startup and
//! injected into the handlers, so nothing reads the environment per request.

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

/// Origin allowed when `RELAY_ALLOWED_ORIGINS` is not set
pub const DEFAULT_ALLOWED_ORIGIN: &str = "https://tals-dotcom.github.io";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,

    /// Origins accepted by exact match
    pub allowed_origins: Vec<String>,
    /// Host suffix accepted for any https origin (preview deployments)
    pub preview_origin_suffix: Option<String>,

    /// Anthropic Messages API URL
    pub anthropic_api_url: String,
    /// Anthropic API key, checked per request
    pub anthropic_api_key: Option<String>,
    /// Value of the `anthropic-version` header
    pub anthropic_version: String,
    /// Model used when the caller does not name one
    pub anthropic_default_model: String,

    /// OpenRouter chat completions URL
    pub openrouter_api_url: String,
    /// OpenRouter API key, checked per request
    pub openrouter_api_key: Option<String>,
    /// Model used when the caller does not name one
    pub openrouter_default_model: String,

    /// Total timeout for upstream calls; `None` waits indefinitely
    pub upstream_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            allowed_origins: vec![DEFAULT_ALLOWED_ORIGIN.to_string()],
            preview_origin_suffix: None,
            anthropic_api_url: "https://api.anthropic.com/v1/messages".to_string(),
            anthropic_api_key: None,
            anthropic_version: "2023-06-01".to_string(),
            anthropic_default_model: "claude-sonnet-4-20250514".to_string(),
            openrouter_api_url: "https://openrouter.ai/api/v1/chat/completions".to_string(),
            openrouter_api_key: None,
            openrouter_default_model: "anthropic/claude-sonnet-4".to_string(),
            upstream_timeout: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let upstream_timeout = match non_empty_var("RELAY_UPSTREAM_TIMEOUT_SECS") {
            Some(raw) => Some(Duration::from_secs(
                raw.parse()
                    .context("Invalid RELAY_UPSTREAM_TIMEOUT_SECS")?,
            )),
            None => None,
        };

        Ok(Self {
            host: env::var("RELAY_HOST").unwrap_or(defaults.host),
            port: match non_empty_var("RELAY_PORT") {
                Some(raw) => raw.parse().context("Invalid RELAY_PORT")?,
                None => defaults.port,
            },

            allowed_origins: non_empty_var("RELAY_ALLOWED_ORIGINS")
                .map(|raw| parse_origin_list(&raw))
                .unwrap_or(defaults.allowed_origins),
            preview_origin_suffix: non_empty_var("RELAY_PREVIEW_ORIGIN_SUFFIX"),

            anthropic_api_url: env::var("ANTHROPIC_API_URL").unwrap_or(defaults.anthropic_api_url),
            anthropic_api_key: non_empty_var("ANTHROPIC_API_KEY"),
            anthropic_version: env::var("ANTHROPIC_VERSION").unwrap_or(defaults.anthropic_version),
            anthropic_default_model: env::var("ANTHROPIC_DEFAULT_MODEL")
                .unwrap_or(defaults.anthropic_default_model),

            openrouter_api_url: env::var("OPENROUTER_API_URL")
                .unwrap_or(defaults.openrouter_api_url),
            openrouter_api_key: non_empty_var("OPENROUTER_API_KEY"),
            openrouter_default_model: env::var("OPENROUTER_DEFAULT_MODEL")
                .unwrap_or(defaults.openrouter_default_model),

            upstream_timeout,
        })
    }
}

/// Read a variable, treating an empty value as unset
fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Split a comma-separated origin list, dropping blanks and trailing slashes
pub fn parse_origin_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_end_matches('/'))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
