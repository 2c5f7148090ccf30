//! Common test utilities for lmbridge
//!
//! Provides an in-process fake provider and helpers to build a test server
//! around the real router.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum_test::TestServer;
use tokio_util::sync::CancellationToken;

use lmbridge::provider::{
    LanguageModel, LanguageModelProvider, ModelInfo, ModelSelector, ProviderError,
    ProviderMessage, ProviderResult, RequestOptions, TextStream,
};
use lmbridge::{routes::create_router, AppState, Config};

/// Test configuration constants
pub mod constants {
    pub const TEST_VENDOR: &str = "copilot";
    pub const TEST_FAMILY: &str = "gpt-4o";
}

/// Model that replays a fixed script of fragments
pub struct FakeModel {
    info: ModelInfo,
    script: Vec<Result<String, String>>,
    fail_on_send: bool,
    pub calls: AtomicUsize,
    pub received: Mutex<Vec<ProviderMessage>>,
    pub token: Mutex<Option<CancellationToken>>,
}

impl FakeModel {
    fn build(family: &str, script: Vec<Result<String, String>>, fail_on_send: bool) -> Arc<Self> {
        Arc::new(Self {
            info: ModelInfo {
                id: format!("{}-test", family),
                vendor: constants::TEST_VENDOR.to_string(),
                family: family.to_string(),
                name: family.to_uppercase(),
            },
            script,
            fail_on_send,
            calls: AtomicUsize::new(0),
            received: Mutex::new(Vec::new()),
            token: Mutex::new(None),
        })
    }

    /// Model that produces the given fragments and then ends
    pub fn fragments(family: &str, fragments: &[&str]) -> Arc<Self> {
        Self::build(family, fragments.iter().map(|f| Ok(f.to_string())).collect(), false)
    }

    /// Model whose script may contain mid-stream failures (`Err(message)`)
    pub fn scripted(family: &str, script: Vec<Result<String, String>>) -> Arc<Self> {
        Self::build(family, script, false)
    }

    /// Model that refuses to start generating
    pub fn refusing(family: &str) -> Arc<Self> {
        Self::build(family, Vec::new(), true)
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn received_messages(&self) -> Vec<ProviderMessage> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for FakeModel {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    async fn send_request(
        &self,
        messages: Vec<ProviderMessage>,
        _options: RequestOptions,
        cancel: CancellationToken,
    ) -> ProviderResult<TextStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.received.lock().unwrap() = messages;
        *self.token.lock().unwrap() = Some(cancel);

        if self.fail_on_send {
            return Err(ProviderError::Unavailable("quota exhausted".to_string()));
        }

        let items: Vec<ProviderResult<String>> = self
            .script
            .iter()
            .cloned()
            .map(|item| item.map_err(ProviderError::Malformed))
            .collect();
        Ok(Box::pin(futures::stream::iter(items)))
    }
}

/// Provider holding a fixed set of models
pub struct FakeProvider {
    models: Vec<Arc<FakeModel>>,
    fail_select: bool,
    pub selectors: Mutex<Vec<ModelSelector>>,
}

impl FakeProvider {
    pub fn new(models: Vec<Arc<FakeModel>>) -> Arc<Self> {
        Arc::new(Self {
            models,
            fail_select: false,
            selectors: Mutex::new(Vec::new()),
        })
    }

    pub fn empty() -> Arc<Self> {
        Self::new(Vec::new())
    }

    /// Provider whose model lookup itself fails
    pub fn broken() -> Arc<Self> {
        Arc::new(Self {
            models: Vec::new(),
            fail_select: true,
            selectors: Mutex::new(Vec::new()),
        })
    }

    pub fn recorded_selectors(&self) -> Vec<ModelSelector> {
        self.selectors.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModelProvider for FakeProvider {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn select_models(
        &self,
        selector: &ModelSelector,
    ) -> ProviderResult<Vec<Arc<dyn LanguageModel>>> {
        self.selectors.lock().unwrap().push(selector.clone());

        if self.fail_select {
            return Err(ProviderError::Unavailable("provider offline".to_string()));
        }

        Ok(self
            .models
            .iter()
            .filter(|m| selector.vendor.as_deref().map_or(true, |v| v == m.info.vendor))
            .filter(|m| selector.family.as_deref().map_or(true, |f| f == m.info.family))
            .map(|m| m.clone() as Arc<dyn LanguageModel>)
            .collect())
    }
}

/// Configuration used by test servers
pub fn test_config() -> Config {
    Config {
        vendor: constants::TEST_VENDOR.to_string(),
        ..Config::default()
    }
}

/// Build a test server around the real router
pub fn test_server(provider: Arc<FakeProvider>) -> TestServer {
    let state = Arc::new(AppState::new(test_config(), provider));
    TestServer::new(create_router(state)).expect("Failed to create test server")
}

/// Split an SSE body into its `data:` payloads
pub fn sse_payloads(body: &str) -> Vec<String> {
    body.split("\n\n")
        .filter(|frame| !frame.is_empty())
        .filter_map(|frame| frame.strip_prefix("data: "))
        .map(str::to_string)
        .collect()
}
