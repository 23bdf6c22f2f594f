//! Header utilities for upstream requests
//!
//! Client headers are never forwarded: every upstream request carries only the
//! content type and the provider credential built here.

use anyhow::anyhow;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use crate::error::RelayResult;

/// Header carrying the Anthropic key
pub const X_API_KEY: HeaderName = HeaderName::from_static("x-api-key");
/// Header pinning the Anthropic API version
pub const ANTHROPIC_VERSION: HeaderName = HeaderName::from_static("anthropic-version");

/// Convert a secret into a sensitive header value.
///
/// Sensitive values are redacted from `Debug` output.
pub fn secret_value(secret: &str) -> RelayResult<HeaderValue> {
    let mut value = HeaderValue::from_str(secret)
        .map_err(|_| anyhow!("API key contains characters not allowed in a header"))?;
    value.set_sensitive(true);
    Ok(value)
}

/// `Content-Type: application/json` plus a bearer token
pub fn bearer_headers(api_key: &str) -> RelayResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, secret_value(&format!("Bearer {}", api_key))?);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}

/// `Content-Type: application/json` plus Anthropic's key and version headers
pub fn anthropic_headers(api_key: &str, version: &str) -> RelayResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(X_API_KEY, secret_value(api_key)?);
    headers.insert(
        ANTHROPIC_VERSION,
        HeaderValue::from_str(version).map_err(|_| anyhow!("Invalid anthropic-version value"))?,
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}
