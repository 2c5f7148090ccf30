//! Error types for lmbridge
//!
//! Every failure in the request path is one of a closed set of kinds, each
//! carrying the context needed to log it and to render an HTTP response.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::provider::ProviderError;

/// Request-level errors
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The requested family matched no provider model
    #[error("No language model available for model: {family}")]
    NoModelAvailable { family: String },

    /// The provider failed, either on model lookup or during generation
    #[error("Provider error for model {model}: {source}")]
    Provider {
        model: String,
        #[source]
        source: ProviderError,
    },

    /// Reading the request or writing the response failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// The request body could not be understood
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl ProxyError {
    pub fn provider(model: impl Into<String>, source: ProviderError) -> Self {
        ProxyError::Provider {
            model: model.into(),
            source,
        }
    }

    /// Short label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::NoModelAvailable { .. } => "no_model_available",
            ProxyError::Provider { .. } => "provider_error",
            ProxyError::Transport(_) => "transport_error",
            ProxyError::BadRequest(_) => "bad_request",
        }
    }

    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::NoModelAvailable { .. }
            | ProxyError::Provider { .. }
            | ProxyError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response body: `{ "error": "<message>" }`
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

/// Result type alias for convenience
pub type ProxyResult<T> = Result<T, ProxyError>;
