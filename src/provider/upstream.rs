//! OpenAI-compatible upstream provider
//!
//! Serves models from any HTTP backend that speaks the OpenAI API (a local
//! inference server, a hosted gateway). Models are listed from `/models`
//! and generation always uses a streaming `/chat/completions` call, so the
//! core sees the same fragment stream for both response modes.

use std::sync::Arc;

use async_stream::try_stream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{
    LanguageModel, LanguageModelProvider, ModelInfo, ModelSelector, ProviderError,
    ProviderMessage, ProviderResult, RequestOptions, TextStream,
};
use crate::config::Config;
use crate::streaming::{data_payload, SseLineBuffer, DONE_SENTINEL};

/// Model list returned by `GET /models`
#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

/// Streaming chunk, reduced to the fields we read
#[derive(Debug, Deserialize)]
struct UpstreamChunk {
    #[serde(default)]
    choices: Vec<UpstreamChoice>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize, Default)]
struct UpstreamChoice {
    #[serde(default)]
    delta: UpstreamDelta,
}

#[derive(Debug, Deserialize, Default)]
struct UpstreamDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Provider backed by an OpenAI-compatible HTTP API
pub struct UpstreamProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    vendor: String,
}

impl UpstreamProvider {
    /// Create a provider from application configuration
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self::with_endpoint(
            client,
            config.provider_api_url.clone(),
            config.provider_api_key.clone(),
            config.vendor.clone(),
        )
    }

    /// Create a provider for an explicit endpoint
    pub fn with_endpoint(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
        vendor: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            vendor: vendor.into(),
        }
    }

    /// Fetch the upstream model list
    async fn list_models(&self) -> ProviderResult<Vec<ModelEntry>> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .headers(self.default_headers()?)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status { status, body });
        }

        let list: ModelList = response.json().await?;
        Ok(list.data)
    }

    /// Build default headers for upstream requests
    fn default_headers(&self) -> ProviderResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(ref key) = self.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {}", key))
                .map_err(|_| ProviderError::Unavailable("invalid API key".to_string()))?;
            headers.insert(AUTHORIZATION, value);
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

#[async_trait]
impl LanguageModelProvider for UpstreamProvider {
    fn name(&self) -> &'static str {
        "upstream"
    }

    async fn select_models(
        &self,
        selector: &ModelSelector,
    ) -> ProviderResult<Vec<Arc<dyn LanguageModel>>> {
        if selector.vendor.as_deref().is_some_and(|v| v != self.vendor) {
            return Ok(Vec::new());
        }

        let headers = self.default_headers()?;
        let models = self
            .list_models()
            .await?
            .into_iter()
            .filter(|entry| selector.family.as_deref().map_or(true, |f| entry.id == f))
            .map(|entry| {
                let model: Arc<dyn LanguageModel> = Arc::new(UpstreamModel {
                    client: self.client.clone(),
                    url: format!("{}/chat/completions", self.base_url),
                    headers: headers.clone(),
                    info: ModelInfo {
                        vendor: self.vendor.clone(),
                        family: entry.id.clone(),
                        name: entry.id.clone(),
                        id: entry.id,
                    },
                });
                model
            })
            .collect();

        Ok(models)
    }
}

/// A single upstream model
pub struct UpstreamModel {
    client: reqwest::Client,
    url: String,
    headers: HeaderMap,
    info: ModelInfo,
}

#[async_trait]
impl LanguageModel for UpstreamModel {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    async fn send_request(
        &self,
        messages: Vec<ProviderMessage>,
        options: RequestOptions,
        cancel: CancellationToken,
    ) -> ProviderResult<TextStream> {
        let mut body = json!({
            "model": self.info.id,
            "messages": messages,
            "stream": true,
        });
        if let Some(object) = body.as_object_mut() {
            object.extend(options.model_options);
        }

        debug!(url = %self.url, model = %self.info.id, "Sending request to upstream");

        let request = self
            .client
            .post(&self.url)
            .headers(self.headers.clone())
            .json(&body)
            .send();

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
            response = request => response?,
        };

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status { status, body });
        }

        let stream = try_stream! {
            let mut body = response.bytes_stream();
            let mut lines = SseLineBuffer::new();
            let mut done = false;

            while !done {
                let next = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(ProviderError::Cancelled),
                    next = body.next() => Ok(next),
                };
                let Some(bytes) = next? else {
                    break;
                };
                let bytes = bytes.map_err(ProviderError::from)?;

                for line in lines.feed(&bytes) {
                    let Some(payload) = data_payload(&line) else {
                        continue;
                    };
                    if payload == DONE_SENTINEL {
                        done = true;
                        break;
                    }
                    if let Some(fragment) = parse_fragment(payload)? {
                        yield fragment;
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

/// Pull the content fragment out of one upstream SSE payload
fn parse_fragment(payload: &str) -> ProviderResult<Option<String>> {
    let chunk: UpstreamChunk = serde_json::from_str(payload)
        .map_err(|e| ProviderError::Malformed(format!("{}: {}", e, payload)))?;

    if let Some(error) = chunk.error {
        return Err(ProviderError::Unavailable(error.to_string()));
    }

    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|content| !content.is_empty()))
}
