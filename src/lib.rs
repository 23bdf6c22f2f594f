//! LLM relay - origin-gated proxy for chat-completion APIs
//!
//! Forwards chat requests from a browser client to Anthropic or OpenRouter,
//! attaching a server-held API key, enforcing an origin allow-list and relaying
//! the answer (buffered JSON or an SSE byte stream) with CORS headers.

pub mod config;
pub mod cors;
pub mod error;
pub mod proxy;
pub mod routes;
pub mod streaming;

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;

pub use crate::config::Config;
pub use crate::cors::{AllowList, CorsHeaders, OriginPolicy, OriginRule};
pub use crate::error::{RelayError, RelayResult};
pub use crate::proxy::{AnthropicProvider, OpenRouterProvider, Provider};

/// Application state shared across all request handlers
///
/// Everything here is read-only after construction; requests share nothing
/// mutable.
pub struct AppState {
    pub config: Config,
    pub http_client: reqwest::Client,
    pub start_time: Instant,
    /// Decides which origins may call the relay
    pub origin_policy: Arc<dyn OriginPolicy>,
    /// Anthropic Messages API
    pub anthropic: Arc<dyn Provider>,
    /// OpenRouter chat completions, buffered and streamed
    pub openrouter: Arc<dyn Provider>,
}

impl AppState {
    /// Create a new application state
    pub fn new(config: Config) -> Result<Self> {
        // No client-wide timeout: it would also cover streamed bodies.
        // `upstream_timeout` is applied per call, up to the response headers.
        let http_client = reqwest::Client::builder()
            .pool_max_idle_per_host(100)
            .build()?;

        let origin_policy: Arc<dyn OriginPolicy> = Arc::new(AllowList::from_config(&config));
        let anthropic: Arc<dyn Provider> = Arc::new(AnthropicProvider::new(&config));
        let openrouter: Arc<dyn Provider> = Arc::new(OpenRouterProvider::new(&config));

        Ok(Self {
            config,
            http_client,
            start_time: Instant::now(),
            origin_policy,
            anthropic,
            openrouter,
        })
    }

    /// Replace the origin allow-list
    pub fn with_origin_policy(mut self, policy: Arc<dyn OriginPolicy>) -> Self {
        self.origin_policy = policy;
        self
    }
}
