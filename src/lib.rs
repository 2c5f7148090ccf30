//! lmbridge - OpenAI-compatible chat endpoint backed by a language-model provider
//!
//! This library accepts OpenAI chat-completion requests, hands the
//! conversation to a model selected from a [`LanguageModelProvider`] and
//! answers in the OpenAI response or SSE chunk format.

pub mod assembler;
pub mod chat;
pub mod config;
pub mod error;
pub mod logging;
pub mod provider;
pub mod resolver;
pub mod routes;
pub mod server;
pub mod streaming;
pub mod translate;

use std::sync::Arc;
use std::time::Instant;

pub use crate::config::Config;
pub use crate::error::{ProxyError, ProxyResult};
pub use crate::provider::{LanguageModel, LanguageModelProvider, UpstreamProvider};
pub use crate::resolver::ModelResolver;
pub use crate::server::ServerHandle;

/// Application state shared across all request handlers
pub struct AppState {
    pub config: Config,
    /// Selects provider models for incoming requests
    pub resolver: ModelResolver,
    pub start_time: Instant,
}

impl AppState {
    /// Create a new application state
    pub fn new(config: Config, provider: Arc<dyn LanguageModelProvider>) -> Self {
        let resolver = ModelResolver::new(provider, config.vendor.clone());

        Self {
            config,
            resolver,
            start_time: Instant::now(),
        }
    }
}
