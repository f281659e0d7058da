//! Bounded retry with exponential backoff for provider calls.
//!
//! Every attempt runs under a hard timeout. Transient failures (rate limits,
//! timeouts, 5xx, connection errors) are retried up to the attempt ceiling;
//! anything else is returned immediately.

use std::time::Duration;

use rand::Rng;
use tracing::warn;

use super::{CompletionRequest, CompletionResponse, LlmProvider, ProviderError};
use crate::config::LlmConfig;

/// Retry budget for one logical provider call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempt ceiling, first call included. Zero is treated as one.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_backoff: Duration,
    /// Upper bound for any single delay.
    pub max_backoff: Duration,
    /// Hard timeout per attempt.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&LlmConfig::default())
    }
}

impl RetryPolicy {
    /// Policy from the `[llm]` config section.
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            timeout: config.timeout(),
        }
    }

    /// Base delay after the given failed attempt (1-based), before jitter.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(exponent))
            .min(self.max_backoff)
    }
}

/// Call the provider, retrying transient failures with jittered backoff.
///
/// # Errors
///
/// Returns the last [`ProviderError`] once the attempt ceiling is reached, or
/// the first non-transient error.
pub async fn complete_with_retry(
    provider: &dyn LlmProvider,
    request: &CompletionRequest,
    policy: &RetryPolicy,
) -> Result<CompletionResponse, ProviderError> {
    let attempts = policy.max_attempts.max(1);
    let mut attempt: u32 = 1;
    loop {
        let outcome = match tokio::time::timeout(policy.timeout, provider.complete(request.clone()))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(policy.timeout)),
        };

        match outcome {
            Ok(response) => return Ok(response),
            Err(e) if !e.is_transient() || attempt >= attempts => return Err(e),
            Err(e) => {
                let base = policy.backoff_for(attempt);
                let jitter_ceiling = base
                    .as_millis()
                    .checked_div(4)
                    .and_then(|ms| u64::try_from(ms).ok())
                    .unwrap_or(0);
                let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ceiling));
                let delay = base.saturating_add(jitter);
                warn!(
                    model = provider.model_id(),
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %e,
                    "transient provider failure, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt = attempt.saturating_add(1);
            }
        }
    }
}
