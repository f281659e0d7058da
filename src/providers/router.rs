//! Model router resolving which provider serves each pipeline role.

use std::sync::Arc;

use crate::config::{LlmConfig, ProviderKind};

use super::anthropic::AnthropicProvider;
use super::ollama::OllamaProvider;
use super::retry::RetryPolicy;
use super::LlmProvider;

/// Provider routing errors.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// Required API credential missing for selected provider.
    #[error("missing credential for provider '{provider}': {key}")]
    MissingCredential {
        /// Provider name.
        provider: String,
        /// Missing credential key.
        key: String,
    },
    /// A provider was selected without a model name.
    #[error("provider '{provider}' selected but no model configured")]
    MissingModel {
        /// Provider name.
        provider: String,
    },
}

/// Pipeline roles that may be served by a language model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRole {
    /// Structured field extraction.
    Extraction,
    /// Reply phrasing.
    Drafting,
}

/// Resolves `role -> provider`, honouring the per-role opt-in flags.
#[derive(Clone, Default)]
pub struct ModelRouter {
    provider: Option<Arc<dyn LlmProvider>>,
    use_for_extraction: bool,
    use_for_drafting: bool,
    retry: RetryPolicy,
}

impl std::fmt::Debug for ModelRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRouter")
            .field("model", &self.provider.as_ref().map(|p| p.model_id()))
            .field("use_for_extraction", &self.use_for_extraction)
            .field("use_for_drafting", &self.use_for_drafting)
            .finish()
    }
}

impl ModelRouter {
    /// Build a router from the `[llm]` config section.
    ///
    /// # Errors
    ///
    /// Returns an error if the selected provider lacks a model or credential.
    pub fn from_config(config: &LlmConfig) -> Result<Self, RouterError> {
        let provider = instantiate_provider(config)?;
        Ok(Self {
            provider,
            use_for_extraction: config.use_for_extraction,
            use_for_drafting: config.use_for_drafting,
            retry: RetryPolicy::from_config(config),
        })
    }

    /// Router with no model at all: every role uses its deterministic path.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Create a router backed by a single provider serving every role.
    #[doc(hidden)]
    pub fn for_testing(provider: Arc<dyn LlmProvider>, retry: RetryPolicy) -> Self {
        Self {
            provider: Some(provider),
            use_for_extraction: true,
            use_for_drafting: true,
            retry,
        }
    }

    /// Provider for a role, or `None` when the role runs deterministically.
    pub fn resolve(&self, role: ModelRole) -> Option<Arc<dyn LlmProvider>> {
        let enabled = match role {
            ModelRole::Extraction => self.use_for_extraction,
            ModelRole::Drafting => self.use_for_drafting,
        };
        if enabled {
            self.provider.clone()
        } else {
            None
        }
    }

    /// Retry budget applied to every routed call.
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }
}

fn instantiate_provider(config: &LlmConfig) -> Result<Option<Arc<dyn LlmProvider>>, RouterError> {
    let provider_name = match config.provider {
        ProviderKind::None => return Ok(None),
        ProviderKind::Anthropic => "anthropic",
        ProviderKind::Ollama => "ollama",
    };
    if config.model.trim().is_empty() {
        return Err(RouterError::MissingModel {
            provider: provider_name.to_owned(),
        });
    }
    let provider: Arc<dyn LlmProvider> = match config.provider {
        ProviderKind::Anthropic => {
            let key = config
                .api_key
                .clone()
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| RouterError::MissingCredential {
                    provider: provider_name.to_owned(),
                    key: "INNKEEPER_LLM_API_KEY".to_owned(),
                })?;
            Arc::new(AnthropicProvider::new(
                config.model.clone(),
                config.base_url.clone(),
                key,
            ))
        }
        ProviderKind::Ollama => Arc::new(OllamaProvider::new(
            config.model.clone(),
            config.base_url.clone(),
        )),
        ProviderKind::None => return Ok(None),
    };
    Ok(Some(provider))
}
