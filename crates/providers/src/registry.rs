//! Provider registry.
//!
//! Constructs and holds all configured LLM provider instances. At startup the
//! registry reads the [`LlmConfig`], resolves authentication (env vars, direct
//! keys), and instantiates the adapter for each configured provider.

use crate::openai_compat::OpenAiCompatProvider;
use crate::traits::LlmProvider;
use gw_domain::config::{LlmConfig, ProviderKind};
use gw_domain::error::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ProviderRegistry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Holds all instantiated LLM providers, in registration order.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
    order: Vec<String>,
    default_provider: Option<String>,
}

impl ProviderRegistry {
    /// Build the registry from the application's [`LlmConfig`].
    ///
    /// Providers that fail to initialize (typically a missing API key) are
    /// logged and skipped rather than aborting startup. Generation requests
    /// fail until at least one provider is available.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let mut registry = Self {
            default_provider: config.default_provider.clone(),
            ..Default::default()
        };
        let timeout = Duration::from_millis(config.request_timeout_ms);

        for pc in &config.providers {
            let result: Result<Arc<dyn LlmProvider>> = match pc.kind {
                ProviderKind::OpenaiCompat | ProviderKind::AzureOpenai => {
                    OpenAiCompatProvider::from_config(pc, &config.model, timeout)
                        .map(|p| Arc::new(p) as Arc<dyn LlmProvider>)
                }
            };

            match result {
                Ok(provider) => {
                    tracing::info!(
                        provider_id = %pc.id,
                        kind = ?pc.kind,
                        "registered LLM provider"
                    );
                    registry.insert(provider);
                }
                Err(e) => {
                    tracing::warn!(
                        provider_id = %pc.id,
                        kind = ?pc.kind,
                        error = %e,
                        "failed to initialize LLM provider, skipping"
                    );
                }
            }
        }

        if registry.is_empty() && !config.providers.is_empty() {
            let require = std::env::var("GW_REQUIRE_LLM")
                .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                .unwrap_or(false);
            if require {
                return Err(Error::Config(
                    "all configured LLM providers failed to initialize".into(),
                ));
            }
            tracing::warn!(
                "no LLM providers initialized; AI endpoints will fail \
                 until auth is configured"
            );
        }

        Ok(registry)
    }

    /// Build a registry around a single, already constructed provider.
    pub fn with_provider(provider: Arc<dyn LlmProvider>) -> Self {
        let mut registry = Self::default();
        registry.insert(provider);
        registry
    }

    fn insert(&mut self, provider: Arc<dyn LlmProvider>) {
        let id = provider.provider_id().to_string();
        if self.providers.insert(id.clone(), provider).is_none() {
            self.order.push(id);
        }
    }

    /// Look up a provider by its config id.
    pub fn get(&self, provider_id: &str) -> Option<Arc<dyn LlmProvider>> {
        self.providers.get(provider_id).cloned()
    }

    /// The provider used for generation: `default_provider` when it is
    /// registered, otherwise the first provider that initialized.
    pub fn primary(&self) -> Option<Arc<dyn LlmProvider>> {
        if let Some(id) = &self.default_provider {
            if let Some(p) = self.get(id) {
                return Some(p);
            }
        }
        self.order.first().and_then(|id| self.get(id))
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// List all registered provider IDs (sorted).
    pub fn list_providers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.providers.keys().cloned().collect();
        ids.sort();
        ids
    }
}
