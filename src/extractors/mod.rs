//! Field extractors: free-text inquiry in, [`IntentRecord`] out.
//!
//! Two strategies implement [`IntentExtractor`]:
//! - [`heuristic::HeuristicExtractor`]: deterministic regex/keyword rules,
//!   always available, never fails.
//! - [`llm::LlmExtractor`]: schema-constrained language-model extraction.
//!
//! [`ExtractorChain`] runs the AI strategy when one is configured and drops
//! to the deterministic one on any failure, so callers always get a record.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::providers::router::{ModelRole, ModelRouter};
use crate::providers::ProviderError;
use crate::types::IntentRecord;

pub mod heuristic;
pub mod llm;
pub mod lookup;

use heuristic::HeuristicExtractor;
use llm::LlmExtractor;

/// Errors from an extraction strategy.
///
/// These never leave [`ExtractorChain`]; they only decide whether the chain
/// falls back.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The language-model call failed after retries.
    #[error("extraction provider failed: {0}")]
    Provider(#[from] ProviderError),
    /// The model replied with something that is not the expected JSON.
    #[error("malformed extraction reply: {0}")]
    Malformed(String),
}

/// A strategy turning inquiry text into an intent record.
#[async_trait]
pub trait IntentExtractor: Send + Sync {
    /// Strategy name for logs.
    fn name(&self) -> &str;

    /// Extract an intent record from raw inquiry text.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError`] when the strategy cannot produce a record.
    async fn extract(&self, text: &str) -> Result<IntentRecord, ExtractError>;
}

/// Which strategies a caller allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractPreference {
    /// AI strategy when configured, deterministic fallback otherwise.
    #[default]
    Auto,
    /// Deterministic strategy only.
    FallbackOnly,
}

/// AI-first extraction with automatic deterministic fallback.
#[derive(Clone)]
pub struct ExtractorChain {
    ai: Option<Arc<dyn IntentExtractor>>,
    fallback: HeuristicExtractor,
}

impl std::fmt::Debug for ExtractorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractorChain")
            .field("ai", &self.ai.as_ref().map(|a| a.name().to_owned()))
            .field("fallback", &self.fallback)
            .finish()
    }
}

impl ExtractorChain {
    /// Chain with an explicit AI strategy.
    pub fn new(ai: Option<Arc<dyn IntentExtractor>>, fallback: HeuristicExtractor) -> Self {
        Self { ai, fallback }
    }

    /// Deterministic-only chain.
    pub fn deterministic(fallback: HeuristicExtractor) -> Self {
        Self { ai: None, fallback }
    }

    /// Chain whose AI strategy is whatever the router assigns to extraction.
    pub fn from_router(router: &ModelRouter, fallback: HeuristicExtractor) -> Self {
        let ai = router.resolve(ModelRole::Extraction).map(|provider| {
            Arc::new(LlmExtractor::new(provider, router.retry_policy()))
                as Arc<dyn IntentExtractor>
        });
        Self { ai, fallback }
    }

    /// Extract a best-effort record. Never fails.
    pub async fn extract(&self, text: &str, preference: ExtractPreference) -> IntentRecord {
        if preference == ExtractPreference::Auto {
            if let Some(ai) = &self.ai {
                match ai.extract(text).await {
                    Ok(record) => {
                        debug!(extractor = ai.name(), "ai extraction succeeded");
                        return record;
                    }
                    Err(e) => {
                        warn!(extractor = ai.name(), error = %e, "ai extraction failed, using heuristic");
                    }
                }
            }
        }
        self.fallback.parse(text)
    }
}
