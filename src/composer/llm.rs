//! Language-model phrasing of offer and no-match replies.
//!
//! The model only rephrases the deterministic draft; it gets the template text
//! as the source of truth. Its output is accepted only when it names no unit
//! outside the candidate tier.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use super::{render, ComposeError, DraftInput, DraftStrategy, OutcomeKind};
use crate::providers::retry::{complete_with_retry, RetryPolicy};
use crate::providers::{CompletionRequest, LlmProvider};

const SYSTEM_PROMPT: &str = "\
You are the reservations desk of a holiday accommodation agency.
Rewrite the draft reply below into a warm, natural email in the same language as the draft.
Keep every accommodation name, price, date and link exactly as written.
Do not add accommodation, prices, dates or promises that are not in the draft.
Reply with the email text only.";

const MAX_TOKENS: u32 = 1500;

/// AI drafting strategy with the unit-name guard.
pub struct LlmDrafter {
    provider: Arc<dyn LlmProvider>,
    retry: RetryPolicy,
}

impl LlmDrafter {
    /// Drafter backed by the given provider and retry budget.
    pub fn new(provider: Arc<dyn LlmProvider>, retry: RetryPolicy) -> Self {
        Self { provider, retry }
    }
}

#[async_trait::async_trait]
impl DraftStrategy for LlmDrafter {
    fn name(&self) -> &str {
        "drafter:llm"
    }

    async fn draft(&self, input: &DraftInput<'_>) -> Result<String, ComposeError> {
        if input.outcome == OutcomeKind::MissingInfo {
            return Err(ComposeError::Unsupported(input.outcome));
        }
        let template = render(input);
        let user = format!(
            "Outcome: {}\nGuest language: {}\n\nDraft:\n{template}",
            input.outcome.as_str(),
            input.intent.language.as_str()
        );
        let mut request = CompletionRequest::single(SYSTEM_PROMPT, user);
        request.max_tokens = Some(MAX_TOKENS);
        request.temperature = Some(0.3);

        let response = complete_with_retry(self.provider.as_ref(), &request, &self.retry).await?;
        debug!(
            model = %response.model,
            output_tokens = response.usage.output_tokens,
            "draft reply received"
        );
        check_unit_names(&response.text, input)
    }
}

/// Reject generated text that is empty or names a unit outside the candidates.
///
/// # Errors
///
/// [`ComposeError::Empty`] or [`ComposeError::UnknownUnit`].
pub fn check_unit_names(text: &str, input: &DraftInput<'_>) -> Result<String, ComposeError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ComposeError::Empty);
    }
    let allowed: BTreeSet<String> = input
        .candidates
        .iter()
        .map(|c| c.unit.name.trim().to_lowercase())
        .collect();
    let lower = text.to_lowercase();
    for name in input.known_unit_names {
        let needle = name.trim().to_lowercase();
        if needle.chars().count() < 3 || allowed.contains(&needle) {
            continue;
        }
        if lower.contains(&needle) {
            return Err(ComposeError::UnknownUnit(name.clone()));
        }
    }
    Ok(text.to_owned())
}
