//! Error types for the relay
//!
//! Every failure is rendered as a JSON body with an `error` field. CORS headers
//! are attached by the caller through [`RelayError::into_response_with`]; the
//! plain [`IntoResponse`] impl renders a bare response, which is what the
//! forbidden-origin path sends.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::cors::CorsHeaders;

/// Relay errors
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Forbidden origin")]
    ForbiddenOrigin,

    #[error("{0} not configured")]
    MissingApiKey(&'static str),

    #[error("Missing or invalid 'messages' field")]
    InvalidMessages,

    /// Non-2xx answer from the provider, relayed as-is
    #[error("Upstream returned {status}")]
    Upstream { status: StatusCode, body: Value },

    #[error("Proxy error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Proxy error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl RelayError {
    /// HTTP status sent to the caller
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            RelayError::ForbiddenOrigin => StatusCode::FORBIDDEN,
            RelayError::MissingApiKey(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RelayError::InvalidMessages => StatusCode::BAD_REQUEST,
            RelayError::Upstream { status, .. } => *status,
            RelayError::Http(_) | RelayError::Internal(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// JSON body sent to the caller
    pub fn body(&self) -> Value {
        match self {
            RelayError::Upstream { body, .. } => body.clone(),
            other => json!({ "error": other.to_string() }),
        }
    }

    /// Render the error with the CORS header set attached
    pub fn into_response_with(self, cors: &CorsHeaders) -> Response {
        let mut response = self.into_response();
        cors.apply(response.headers_mut());
        response
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

/// Result type alias for convenience
pub type RelayResult<T> = Result<T, RelayError>;
