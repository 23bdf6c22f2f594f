//! Proxy module
//!
//! Upstream providers and the helpers used to reach them.

pub mod anthropic;
pub mod headers;
pub mod logging;
pub mod openrouter;
pub mod provider;

pub use anthropic::AnthropicProvider;
pub use logging::RequestContext;
pub use openrouter::OpenRouterProvider;
pub use provider::{ChatRequest, Provider, DEFAULT_MAX_TOKENS};
