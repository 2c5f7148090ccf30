//! Language model provider abstraction
//!
//! Defines the trait interface for the backend that actually generates text.
//! A provider lists the models it can serve; a model accepts an ordered
//! message list and returns a stream of text fragments.

pub mod upstream;

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

pub use upstream::UpstreamProvider;

/// Errors raised by a provider or one of its models
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed provider response: {0}")]
    Malformed(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Provider unavailable: {0}")]
    Unavailable(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Stream of generated text fragments, in arrival order
pub type TextStream = Pin<Box<dyn Stream<Item = ProviderResult<String>> + Send>>;

/// Role of a provider-side message
///
/// Providers only distinguish the two sides of a conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderRole {
    User,
    Assistant,
}

/// A message in the provider's native format
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderMessage {
    pub role: ProviderRole,
    pub content: String,
}

impl ProviderMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ProviderRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ProviderRole::Assistant,
            content: content.into(),
        }
    }
}

/// Per-call options passed to a model
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    /// Extra model options merged into the provider request
    pub model_options: Map<String, Value>,
}

/// Criteria for selecting models from a provider
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelSelector {
    pub vendor: Option<String>,
    pub family: Option<String>,
}

impl ModelSelector {
    pub fn vendor(vendor: impl Into<String>) -> Self {
        Self {
            vendor: Some(vendor.into()),
            family: None,
        }
    }

    pub fn with_family(mut self, family: impl Into<String>) -> Self {
        self.family = Some(family.into());
        self
    }
}

/// Descriptive metadata of a model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelInfo {
    pub id: String,
    pub vendor: String,
    pub family: String,
    pub name: String,
}

/// A concrete model that can generate text
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Metadata for logging and model listings
    fn info(&self) -> &ModelInfo;

    /// Send a conversation to the model
    ///
    /// Returns once generation has started; fragments arrive on the returned
    /// stream. Implementations should stop producing fragments once `cancel`
    /// fires.
    async fn send_request(
        &self,
        messages: Vec<ProviderMessage>,
        options: RequestOptions,
        cancel: CancellationToken,
    ) -> ProviderResult<TextStream>;
}

/// Trait defining the interface for language model providers
#[async_trait]
pub trait LanguageModelProvider: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &'static str;

    /// Return every model matching the selector, best match first
    async fn select_models(
        &self,
        selector: &ModelSelector,
    ) -> ProviderResult<Vec<Arc<dyn LanguageModel>>>;
}
