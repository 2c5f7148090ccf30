//! Model resolution
//!
//! Clients name models however their tooling prefers ("openrouter/anthropic/
//! claude-3.5-sonnet", "claude-3.5-sonnet"). Only the last path segment is
//! the family the provider is asked for.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{ProxyError, ProxyResult};
use crate::provider::{LanguageModel, LanguageModelProvider, ModelSelector};

/// Strip vendor/path prefixes from a requested model identifier
pub fn family_name(model_id: &str) -> &str {
    model_id.rsplit('/').next().unwrap_or(model_id)
}

/// Resolves requested model identifiers to provider model handles
///
/// Resolution happens per request; handles are never cached.
#[derive(Clone)]
pub struct ModelResolver {
    provider: Arc<dyn LanguageModelProvider>,
    vendor: String,
}

impl ModelResolver {
    pub fn new(provider: Arc<dyn LanguageModelProvider>, vendor: impl Into<String>) -> Self {
        Self {
            provider,
            vendor: vendor.into(),
        }
    }

    /// Vendor every lookup is restricted to
    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    pub fn provider(&self) -> &Arc<dyn LanguageModelProvider> {
        &self.provider
    }

    /// Resolve a model identifier to the first matching provider model
    pub async fn resolve(&self, model_id: &str) -> ProxyResult<Arc<dyn LanguageModel>> {
        let family = family_name(model_id);
        let selector = ModelSelector::vendor(&self.vendor).with_family(family);

        let models = self
            .provider
            .select_models(&selector)
            .await
            .map_err(|e| ProxyError::provider(family, e))?;

        match models.into_iter().next() {
            Some(model) => {
                debug!(
                    requested = %model_id,
                    family = %family,
                    model_id = %model.info().id,
                    provider = self.provider.name(),
                    "Resolved model"
                );
                Ok(model)
            }
            None => {
                warn!(
                    requested = %model_id,
                    family = %family,
                    vendor = %self.vendor,
                    "No language model available"
                );
                Err(ProxyError::NoModelAvailable {
                    family: family.to_string(),
                })
            }
        }
    }

    /// List every model the vendor offers
    pub async fn available_models(&self) -> ProxyResult<Vec<Arc<dyn LanguageModel>>> {
        self.provider
            .select_models(&ModelSelector::vendor(&self.vendor))
            .await
            .map_err(|e| ProxyError::provider("*", e))
    }
}
