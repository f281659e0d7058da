//! Draft composer: renders a reply from intent, candidates and outcome kind.
//!
//! The template is chosen by [`OutcomeKind`] alone. An optional AI strategy may
//! rephrase offer and no-match replies; its output is rejected (and the
//! template used verbatim) when it fails or names a unit that is not among the
//! candidates.

use std::fmt::Write as _;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::gate::MissingReasons;
use crate::matcher::Candidate;
use crate::providers::router::{ModelRole, ModelRouter};
use crate::providers::ProviderError;
use crate::ranking::Suggestions;
use crate::types::{IntentRecord, UnknownValue};

pub mod llm;
pub mod phrasebook;

use llm::LlmDrafter;
use phrasebook::Phrasebook;

/// Alternatives listed in a no-match reply at most.
pub const MAX_LISTED_ALTERNATIVES: usize = 5;

/// Which reply template applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// Primary candidates exist.
    Offer,
    /// The gate reported gaps.
    MissingInfo,
    /// No exact match, but alternatives exist.
    NoPrimaryWithAlternatives,
    /// Nothing at all.
    NoMatchAtAll,
}

impl OutcomeKind {
    /// Stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Offer => "offer",
            Self::MissingInfo => "missing_info",
            Self::NoPrimaryWithAlternatives => "no_primary_with_alternatives",
            Self::NoMatchAtAll => "no_match_at_all",
        }
    }

    /// Derive the outcome from gate result and suggestion tiers.
    pub fn derive(missing: &MissingReasons, suggestions: Option<&Suggestions>) -> Self {
        if !missing.is_empty() {
            return Self::MissingInfo;
        }
        match suggestions {
            Some(s) if !s.primary.is_empty() => Self::Offer,
            Some(s) if !s.alternatives.is_empty() => Self::NoPrimaryWithAlternatives,
            _ => Self::NoMatchAtAll,
        }
    }
}

impl FromStr for OutcomeKind {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "offer" => Ok(Self::Offer),
            "missing_info" => Ok(Self::MissingInfo),
            "no_primary_with_alternatives" => Ok(Self::NoPrimaryWithAlternatives),
            "no_match_at_all" => Ok(Self::NoMatchAtAll),
            other => Err(UnknownValue {
                field: "outcome_kind",
                value: other.to_owned(),
            }),
        }
    }
}

/// Everything a draft is rendered from.
#[derive(Debug, Clone, Copy)]
pub struct DraftInput<'a> {
    /// Extracted intent.
    pub intent: &'a IntentRecord,
    /// Guest display name, if known.
    pub guest_name: Option<&'a str>,
    /// Candidate tier to present (primary for offers, alternatives otherwise).
    pub candidates: &'a [Candidate],
    /// Template selector.
    pub outcome: OutcomeKind,
    /// Gate reasons; rendered only for [`OutcomeKind::MissingInfo`].
    pub missing: &'a MissingReasons,
    /// Every unit name in the inventory, for the AI name guard.
    pub known_unit_names: &'a [String],
}

/// Errors from a drafting strategy.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    /// The language-model call failed after retries.
    #[error("drafting provider failed: {0}")]
    Provider(#[from] ProviderError),
    /// Generated text was empty.
    #[error("generated draft was empty")]
    Empty,
    /// Generated text names a unit that is not a candidate.
    #[error("generated draft mentions unit {0:?} which is not a candidate")]
    UnknownUnit(String),
    /// This strategy does not handle the outcome.
    #[error("outcome {0:?} is rendered by template only")]
    Unsupported(OutcomeKind),
}

/// A drafting strategy.
#[async_trait]
pub trait DraftStrategy: Send + Sync {
    /// Strategy name for logs.
    fn name(&self) -> &str;

    /// Produce a draft.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError`] when the strategy cannot produce a usable draft.
    async fn draft(&self, input: &DraftInput<'_>) -> Result<String, ComposeError>;
}

/// Deterministic template strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateDrafter;

#[async_trait]
impl DraftStrategy for TemplateDrafter {
    fn name(&self) -> &str {
        "drafter:template"
    }

    async fn draft(&self, input: &DraftInput<'_>) -> Result<String, ComposeError> {
        Ok(render(input))
    }
}

/// AI-first drafting with the template as automatic fallback.
#[derive(Clone, Default)]
pub struct DraftComposer {
    ai: Option<Arc<dyn DraftStrategy>>,
}

impl std::fmt::Debug for DraftComposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DraftComposer")
            .field("ai", &self.ai.as_ref().map(|a| a.name().to_owned()))
            .finish()
    }
}

impl DraftComposer {
    /// Composer with an explicit AI strategy.
    pub fn new(ai: Option<Arc<dyn DraftStrategy>>) -> Self {
        Self { ai }
    }

    /// Template-only composer.
    pub fn deterministic() -> Self {
        Self { ai: None }
    }

    /// Composer whose AI strategy is whatever the router assigns to drafting.
    pub fn from_router(router: &ModelRouter) -> Self {
        let ai = router.resolve(ModelRole::Drafting).map(|provider| {
            Arc::new(LlmDrafter::new(provider, router.retry_policy())) as Arc<dyn DraftStrategy>
        });
        Self { ai }
    }

    /// Compose a draft. Never fails.
    pub async fn compose(&self, input: &DraftInput<'_>) -> String {
        if input.outcome != OutcomeKind::MissingInfo {
            if let Some(ai) = &self.ai {
                match ai.draft(input).await {
                    Ok(text) => {
                        debug!(drafter = ai.name(), outcome = input.outcome.as_str(), "ai draft accepted");
                        return text;
                    }
                    Err(e) => {
                        warn!(drafter = ai.name(), error = %e, "ai draft rejected, using template");
                    }
                }
            }
        }
        render(input)
    }
}

// ---------------------------------------------------------------------------
// Deterministic templates
// ---------------------------------------------------------------------------

/// Render the deterministic template for the input's outcome.
pub fn render(input: &DraftInput<'_>) -> String {
    let book = phrasebook::for_language(input.intent.language);
    let mut out = String::new();
    push_greeting(&mut out, book, input.guest_name);

    match input.outcome {
        OutcomeKind::MissingInfo => {
            let _ = writeln!(out, "{}", book.missing_heading);
            for text in input.missing.texts(input.intent.language) {
                let _ = writeln!(out, "- {text}");
            }
            let _ = writeln!(out);
            let _ = writeln!(out, "{}", book.missing_call_to_action);
        }
        OutcomeKind::Offer => {
            push_summary(&mut out, book, input.intent);
            let _ = writeln!(out, "{}", book.offer_heading);
            let _ = writeln!(out);
            for (idx, candidate) in input.candidates.iter().enumerate() {
                push_offer_entry(&mut out, book, idx.saturating_add(1), candidate);
            }
            let _ = writeln!(out, "{}", book.offer_call_to_action);
            let _ = writeln!(out, "{}", book.provisional_prices);
        }
        OutcomeKind::NoPrimaryWithAlternatives | OutcomeKind::NoMatchAtAll => {
            let _ = writeln!(out, "{}", book.no_match);
            let _ = writeln!(out);
            if !input.candidates.is_empty() {
                let _ = writeln!(out, "{}", book.alternatives_heading);
                for (idx, candidate) in input
                    .candidates
                    .iter()
                    .take(MAX_LISTED_ALTERNATIVES)
                    .enumerate()
                {
                    push_alternative_entry(&mut out, book, idx.saturating_add(1), candidate);
                }
                let _ = writeln!(out);
            }
            let _ = writeln!(out, "{}", book.flexibility_heading);
            for question in book.flexibility_questions {
                let _ = writeln!(out, "- {question}");
            }
        }
    }

    let _ = writeln!(out);
    let _ = write!(out, "{}", book.sign_off);
    out
}

fn push_greeting(out: &mut String, book: &Phrasebook, guest_name: Option<&str>) {
    match guest_name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => {
            let _ = writeln!(out, "{} {name},", book.greeting_named);
        }
        None => {
            let _ = writeln!(out, "{}", book.greeting_anonymous);
        }
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", book.thanks);
    let _ = writeln!(out);
}

fn push_summary(out: &mut String, book: &Phrasebook, intent: &IntentRecord) {
    let mut lines = Vec::new();

    let destination: Vec<&str> = [intent.location.as_deref(), intent.region.as_deref()]
        .into_iter()
        .flatten()
        .filter(|s| !s.trim().is_empty())
        .collect();
    if !destination.is_empty() {
        lines.push(format!("{}: {}", book.destination, destination.join(", ")));
    }

    if let Some((from, to)) = intent.resolved_range() {
        let nights = to.signed_duration_since(from).num_days();
        lines.push(format!(
            "{}: {} - {} ({nights} {})",
            book.dates,
            from.format(book.date_format),
            to.format(book.date_format),
            book.nights
        ));
    } else if let (Some(window), Some(nights)) = (intent.date_window, intent.nights) {
        lines.push(format!(
            "{}: {} {} ±{}, {nights} {}",
            book.dates,
            book.around,
            window.anchor.format(book.date_format),
            window.tolerance_days,
            book.nights
        ));
    }

    if let Some(adults) = intent.total_adults() {
        let mut party = format!("{}: {adults} {}", book.party, book.adults);
        let children = intent.children_total();
        if children > 0 {
            let _ = write!(party, ", {children} {}", book.children);
            let ages = intent.known_child_ages();
            if !ages.is_empty() {
                let ages: Vec<String> = ages.iter().map(u8::to_string).collect();
                let _ = write!(party, " ({} {})", book.ages, ages.join(", "));
            }
        }
        lines.push(party);
    }

    if let Some(budget) = intent.budget_per_night {
        lines.push(format!(
            "{}: {} {} € {}",
            book.budget,
            book.budget_up_to,
            money(budget),
            book.per_night
        ));
    }

    if lines.is_empty() {
        return;
    }
    let _ = writeln!(out, "{}", book.summary_heading);
    for line in lines {
        let _ = writeln!(out, "- {line}");
    }
    let _ = writeln!(out);
}

fn push_offer_entry(out: &mut String, book: &Phrasebook, number: usize, candidate: &Candidate) {
    let unit = &candidate.unit;
    let _ = writeln!(out, "{number}. {} - {}", unit.name, place(candidate));

    let mut type_line = Vec::new();
    if !unit.unit_type.trim().is_empty() {
        type_line.push(unit.unit_type.clone());
    }
    if !candidate.room.title.trim().is_empty() {
        type_line.push(candidate.room.title.clone());
    }
    type_line.push(
        book.up_to_persons
            .replace("{}", &unit.max_capacity.max(candidate.room.max_adults).to_string()),
    );
    let _ = writeln!(out, "   {}: {}", book.unit_type, type_line.join(", "));

    match (candidate.total_price, candidate.per_night) {
        (Some(total), Some(per_night)) => {
            let _ = writeln!(
                out,
                "   {}: {} € {} ({} € {})",
                book.price,
                money(total),
                book.total,
                money(per_night),
                book.per_night
            );
        }
        (None, Some(price)) | (Some(price), None) => {
            let _ = writeln!(out, "   {}: {} €", book.price, money(price));
        }
        (None, None) => {}
    }

    let beach = match (unit.beach_distance_m, unit.beach_type.as_deref()) {
        (Some(m), Some(kind)) => Some(format!(
            "{}, {kind}",
            book.metres_from_beach.replace("{}", &m.to_string())
        )),
        (Some(m), None) => Some(book.metres_from_beach.replace("{}", &m.to_string())),
        (None, Some(kind)) => Some(kind.to_owned()),
        (None, None) => None,
    };
    if let Some(beach) = beach {
        let _ = writeln!(out, "   {}: {beach}", book.beach);
    }

    let yes_no = |flag: bool| if flag { book.yes } else { book.no };
    let mut flags = Vec::new();
    if let Some(parking) = unit.parking {
        flags.push(format!("{}: {}", book.parking, yes_no(parking)));
    }
    if let Some(pets) = unit.pets_allowed {
        flags.push(format!("{}: {}", book.pets, yes_no(pets)));
    }
    if !flags.is_empty() {
        let _ = writeln!(out, "   {}", flags.join("; "));
    }

    if let Some(noise) = unit.noise_level.as_deref().filter(|s| !s.trim().is_empty()) {
        let _ = writeln!(out, "   {}: {noise}", book.surroundings);
    }
    if let Some(note) = unit
        .availability_note
        .as_deref()
        .filter(|s| !s.trim().is_empty())
    {
        let _ = writeln!(out, "   {}: {note}", book.note);
    }
    let _ = writeln!(out);
}

fn push_alternative_entry(
    out: &mut String,
    book: &Phrasebook,
    number: usize,
    candidate: &Candidate,
) {
    let mut parts = vec![format!("{} ({})", candidate.unit.name, place(candidate))];
    if let Some(price) = candidate.price_key() {
        parts.push(format!("{} € {}", money(price), book.per_night));
    }
    if let Some(link) = candidate.unit.link.as_deref().filter(|s| !s.trim().is_empty()) {
        parts.push(link.to_owned());
    }
    let _ = writeln!(out, "{number}. {}", parts.join(" - "));
}

fn place(candidate: &Candidate) -> String {
    [candidate.unit.location.as_str(), candidate.unit.region.as_str()]
        .into_iter()
        .filter(|s| !s.trim().is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Format a price: whole amounts without decimals, otherwise two decimals.
pub fn money(value: Decimal) -> String {
    let rounded = value.round_dp(2);
    if rounded.fract().is_zero() {
        rounded.trunc().to_string()
    } else {
        format!("{rounded:.2}")
    }
}
