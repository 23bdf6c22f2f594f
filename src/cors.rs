//! Origin allow-list and CORS headers
//!
//! The allow-list is a plain predicate over the request's `Origin` value so it
//! can be replaced without touching the relay. The CORS header set is computed
//! once per request and attached to every response except the forbidden-origin
//! rejection.

use axum::http::{
    header::{
        ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
        ACCESS_CONTROL_MAX_AGE,
    },
    HeaderMap, HeaderValue,
};

use crate::config::Config;

/// Methods advertised to browsers
pub const ALLOWED_METHODS: &str = "POST, OPTIONS";
/// Request headers advertised to browsers
pub const ALLOWED_HEADERS: &str = "Content-Type";
/// Preflight cache lifetime in seconds
pub const MAX_AGE_SECONDS: &str = "86400";

/// Decides whether an origin may use the relay
pub trait OriginPolicy: Send + Sync {
    fn allows(&self, origin: &str) -> bool;
}

impl<F> OriginPolicy for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn allows(&self, origin: &str) -> bool {
        self(origin)
    }
}

/// A single allow-list entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginRule {
    /// Origin must match exactly
    Exact(String),
    /// Origin must start with `scheme` and end with `suffix`,
    /// e.g. `https://` + `*.vercel.app`
    PreviewSuffix { scheme: String, suffix: String },
}

impl OriginRule {
    pub fn matches(&self, origin: &str) -> bool {
        match self {
            OriginRule::Exact(allowed) => origin == allowed,
            OriginRule::PreviewSuffix { scheme, suffix } => origin
                .strip_prefix(scheme.as_str())
                .is_some_and(|host| host.len() > suffix.len() && host.ends_with(suffix.as_str())),
        }
    }
}

/// Small fixed table of origin rules
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    rules: Vec<OriginRule>,
}

impl AllowList {
    pub fn new(rules: Vec<OriginRule>) -> Self {
        Self { rules }
    }

    /// Build the allow-list from exact origins plus the optional preview suffix
    pub fn from_config(config: &Config) -> Self {
        let mut rules: Vec<OriginRule> = config
            .allowed_origins
            .iter()
            .cloned()
            .map(OriginRule::Exact)
            .collect();

        if let Some(suffix) = &config.preview_origin_suffix {
            rules.push(OriginRule::PreviewSuffix {
                scheme: "https://".to_string(),
                suffix: suffix.clone(),
            });
        }

        Self { rules }
    }

    pub fn rules(&self) -> &[OriginRule] {
        &self.rules
    }
}

impl OriginPolicy for AllowList {
    fn allows(&self, origin: &str) -> bool {
        self.rules.iter().any(|rule| rule.matches(origin))
    }
}

/// CORS headers computed for one request
#[derive(Debug, Clone)]
pub struct CorsHeaders {
    allow_origin: HeaderValue,
    origin_present: bool,
    origin_allowed: bool,
}

impl CorsHeaders {
    /// Evaluate the request origin against the policy.
    ///
    /// An absent or empty origin is treated as same-origin: the request may
    /// proceed but the allow-origin value stays empty.
    pub fn resolve(policy: &dyn OriginPolicy, origin: Option<&str>) -> Self {
        let origin = origin.filter(|o| !o.is_empty());
        let origin_allowed = origin.is_some_and(|o| policy.allows(o));

        let allow_origin = match origin {
            Some(o) if origin_allowed => {
                HeaderValue::from_str(o).unwrap_or_else(|_| HeaderValue::from_static(""))
            }
            _ => HeaderValue::from_static(""),
        };

        Self {
            allow_origin,
            origin_present: origin.is_some(),
            origin_allowed,
        }
    }

    /// True when an origin was sent and the policy rejected it
    pub fn is_forbidden(&self) -> bool {
        self.origin_present && !self.origin_allowed
    }

    pub fn allow_origin(&self) -> &HeaderValue {
        &self.allow_origin
    }

    /// Write the header set into a response header map
    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, self.allow_origin.clone());
        headers.insert(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        );
        headers.insert(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        );
        headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static(MAX_AGE_SECONDS));
    }

    pub fn to_header_map(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        self.apply(&mut headers);
        headers
    }
}
