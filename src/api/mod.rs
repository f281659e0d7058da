//! Direct entry points: structured extraction, relevance search and the full
//! extract → gate → match → rank → draft flow for one piece of text.
//!
//! Request and response types are plain serde structs so any front end (CLI,
//! HTTP, queue consumer) can carry them as JSON.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::composer::{DraftComposer, DraftInput, OutcomeKind};
use crate::extractors::{ExtractPreference, ExtractorChain};
use crate::gate::{self, GateContext, MissingReasons};
use crate::inventory::AccommodationUnit;
use crate::matcher::Candidate;
use crate::ranking::{self, SearchQuery, Suggestions, TierPolicy};
use crate::types::IntentRecord;

/// `{raw_text}` for extraction and the full flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRequest {
    /// Inquiry text.
    pub raw_text: String,
}

/// Relevance search request.
pub type SearchRequest = SearchQuery;

/// Relevance search response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Number of results.
    pub count: usize,
    /// Ranked candidates.
    pub results: Vec<Candidate>,
}

/// Full-flow response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowResponse {
    /// Extracted intent.
    pub parsed_inquiry: IntentRecord,
    /// Gate output, as reason codes.
    pub missing_fields: MissingReasons,
    /// Suggestion tiers; empty when the gate blocked matching.
    pub suggestions: Suggestions,
    /// Which reply template applied.
    pub outcome: OutcomeKind,
    /// Reply draft.
    pub draft_reply: String,
}

/// Stateless service over the pipeline components.
#[derive(Debug, Clone)]
pub struct InquiryApi {
    extractor: ExtractorChain,
    composer: DraftComposer,
    tiers: TierPolicy,
}

impl InquiryApi {
    /// Service from its parts.
    pub fn new(extractor: ExtractorChain, composer: DraftComposer, tiers: TierPolicy) -> Self {
        Self {
            extractor,
            composer,
            tiers,
        }
    }

    /// Structured extraction.
    pub async fn extract(&self, request: &TextRequest) -> IntentRecord {
        self.extractor
            .extract(&request.raw_text, ExtractPreference::Auto)
            .await
    }

    /// Relevance search over a snapshot of the inventory.
    pub fn search(&self, units: &[AccommodationUnit], request: &SearchRequest) -> SearchResponse {
        let results = ranking::search(units, request, self.tiers.budget_slack, self.tiers.search_cap);
        SearchResponse {
            count: results.len(),
            results,
        }
    }

    /// Extract, gate, match, rank and draft in one call.
    pub async fn flow(&self, units: &[AccommodationUnit], request: &TextRequest) -> FlowResponse {
        let intent = self.extract(request).await;
        let missing = gate::detect(&intent, &GateContext::new(&request.raw_text));

        let suggestions = if missing.is_empty() {
            ranking::suggest(units, &intent, &self.tiers)
        } else {
            let codes: Vec<&str> = missing.iter().map(|r| r.as_str()).collect();
            Suggestions {
                log: vec![format!("gate: matching skipped, missing {}", codes.join(", "))],
                ..Suggestions::default()
            }
        };
        let outcome = OutcomeKind::derive(&missing, Some(&suggestions));
        let candidates: &[Candidate] = match outcome {
            OutcomeKind::Offer => &suggestions.primary,
            OutcomeKind::NoPrimaryWithAlternatives => &suggestions.alternatives,
            OutcomeKind::MissingInfo | OutcomeKind::NoMatchAtAll => &[],
        };
        let unit_names: Vec<String> = units.iter().map(|u| u.name.clone()).collect();
        let draft_reply = self
            .composer
            .compose(&DraftInput {
                intent: &intent,
                guest_name: None,
                candidates,
                outcome,
                missing: &missing,
                known_unit_names: &unit_names,
            })
            .await;
        debug!(outcome = outcome.as_str(), missing = missing.len(), "flow finished");

        FlowResponse {
            parsed_inquiry: intent,
            missing_fields: missing,
            suggestions,
            outcome,
            draft_reply,
        }
    }
}
