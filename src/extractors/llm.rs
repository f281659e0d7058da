//! Language-model extraction strategy.
//!
//! Sends the inquiry with a fixed JSON schema prompt and maps the reply onto
//! an [`IntentRecord`]. The mapping is lenient field by field: a value that
//! does not fit its type becomes `None`, only an unparseable reply as a whole
//! is an error.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::lookup::LookupTables;
use super::{ExtractError, IntentExtractor};
use crate::providers::retry::{complete_with_retry, RetryPolicy};
use crate::providers::{extract_json_object, CompletionRequest, LlmProvider};
use crate::types::{
    Child, DateWindow, ExtractionMode, InquiryKind, IntentRecord, Language, PartyGroup, Want,
    MAX_BUDGET_PER_NIGHT, NIGHTS_RANGE,
};

const SYSTEM_PROMPT: &str = "\
You extract booking parameters from accommodation inquiries written in Serbian or English.
Reply with ONE JSON object and nothing else. Use null for anything the text does not state.
Never guess dates, prices or places that are not in the text.

Schema:
{
  \"inquiry_kind\": \"booking\" | \"non_booking\",
  \"region\": string | null,
  \"location\": string | null,
  \"date_from\": \"YYYY-MM-DD\" | null,
  \"date_to\": \"YYYY-MM-DD\" | null,
  \"date_window\": {\"anchor\": \"YYYY-MM-DD\", \"tolerance_days\": integer} | null,
  \"nights\": integer | null,
  \"adults\": integer | null,
  \"children\": [{\"age\": integer | null}],
  \"children_count\": integer | null,
  \"party_groups\": [{\"adults\": integer | null, \"children\": integer, \"children_ages\": [integer]}],
  \"budget_per_night\": number | null,
  \"wants\": [\"near-beach\" | \"parking\" | \"quiet\" | \"pool\" | \"pets-allowed\" | \"wifi\" | \"air-conditioning\"],
  \"language\": \"sr\" | \"en\"
}

Rules:
- date_to is the check-out day. Dates without a year are in the next occurrence after today.
- budget_per_night is per night for the whole party, in EUR. Convert totals only when nights are stated.
- party_groups only when the sender explicitly books for several separate groups.
- inquiry_kind is non_booking for invoices, complaints about past stays, newsletters and spam.";

const MAX_TOKENS: u32 = 800;

/// Schema-constrained extraction via an [`LlmProvider`].
pub struct LlmExtractor {
    provider: Arc<dyn LlmProvider>,
    retry: RetryPolicy,
}

impl LlmExtractor {
    /// Extractor backed by the given provider and retry budget.
    pub fn new(provider: Arc<dyn LlmProvider>, retry: RetryPolicy) -> Self {
        Self { provider, retry }
    }
}

#[async_trait::async_trait]
impl IntentExtractor for LlmExtractor {
    fn name(&self) -> &str {
        "extractor:llm"
    }

    async fn extract(&self, text: &str) -> Result<IntentRecord, ExtractError> {
        let today = Utc::now().date_naive();
        let user = format!("Today is {today}.\n\nInquiry:\n{text}");
        let mut request = CompletionRequest::single(SYSTEM_PROMPT, user);
        request.max_tokens = Some(MAX_TOKENS);

        let response = complete_with_retry(self.provider.as_ref(), &request, &self.retry).await?;
        debug!(
            model = %response.model,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "extraction reply received"
        );
        parse_reply(&response.text, text)
    }
}

/// Wire shape of the model reply. Loose types; converted field by field.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ReplyRecord {
    inquiry_kind: Option<String>,
    region: Option<String>,
    location: Option<String>,
    date_from: Option<String>,
    date_to: Option<String>,
    date_window: Option<ReplyWindow>,
    nights: Option<Value>,
    adults: Option<Value>,
    children: Vec<Value>,
    children_count: Option<Value>,
    party_groups: Vec<ReplyGroup>,
    budget_per_night: Option<Value>,
    wants: Vec<String>,
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReplyWindow {
    anchor: String,
    #[serde(default)]
    tolerance_days: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ReplyGroup {
    adults: Option<Value>,
    children: Option<Value>,
    children_ages: Vec<Value>,
}

/// Map a model reply onto an intent record.
///
/// `source_text` is used for the language guess when the model omits it.
///
/// # Errors
///
/// Returns [`ExtractError::Malformed`] when no JSON object can be parsed.
pub fn parse_reply(reply: &str, source_text: &str) -> Result<IntentRecord, ExtractError> {
    let json = extract_json_object(reply)
        .ok_or_else(|| ExtractError::Malformed("no JSON object in reply".to_owned()))?;
    let wire: ReplyRecord =
        serde_json::from_str(json).map_err(|e| ExtractError::Malformed(e.to_string()))?;

    let language = wire
        .language
        .as_deref()
        .and_then(|l| Language::from_str(l).ok())
        .unwrap_or_else(|| {
            if LookupTables::get().looks_english(&source_text.to_lowercase()) {
                Language::En
            } else {
                Language::Sr
            }
        });

    let mut record = IntentRecord {
        inquiry_kind: match wire.inquiry_kind.as_deref() {
            Some("non_booking") => InquiryKind::NonBooking,
            _ => InquiryKind::Booking,
        },
        region: non_empty(wire.region),
        location: non_empty(wire.location),
        date_from: wire.date_from.as_deref().and_then(parse_date),
        date_to: wire.date_to.as_deref().and_then(parse_date),
        date_window: wire.date_window.and_then(|w| {
            Some(DateWindow {
                anchor: parse_date(&w.anchor)?,
                tolerance_days: w.tolerance_days.as_ref().and_then(as_u32).unwrap_or(0),
            })
        }),
        nights: wire
            .nights
            .as_ref()
            .and_then(as_u32)
            .filter(|n| NIGHTS_RANGE.contains(n)),
        adults: wire.adults.as_ref().and_then(as_u32),
        children: wire.children.iter().map(as_child).collect(),
        children_count: wire.children_count.as_ref().and_then(as_u32),
        party_groups: wire
            .party_groups
            .iter()
            .map(|g| PartyGroup {
                adults: g.adults.as_ref().and_then(as_u32),
                children: g.children.as_ref().and_then(as_u32).unwrap_or(0),
                children_ages: g
                    .children_ages
                    .iter()
                    .filter_map(as_u32)
                    .filter_map(|a| u8::try_from(a).ok())
                    .collect(),
            })
            .collect(),
        budget_per_night: wire
            .budget_per_night
            .as_ref()
            .and_then(as_decimal)
            .filter(|b| *b > Decimal::ZERO && *b <= Decimal::from(MAX_BUDGET_PER_NIGHT)),
        wants: wire
            .wants
            .iter()
            .filter_map(|w| Want::from_str(w).ok())
            .collect(),
        language,
        extraction_mode: ExtractionMode::Ai,
    };
    record.normalize();
    Ok(record)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("null"))
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

fn as_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        Value::String(s) => Decimal::from_str(&s.trim().replace(',', ".")).ok(),
        _ => None,
    }
}

fn as_child(value: &Value) -> Child {
    let age = match value {
        Value::Object(map) => map.get("age").and_then(as_u32),
        other => as_u32(other),
    };
    age.and_then(|a| u8::try_from(a).ok())
        .map_or_else(Child::unknown_age, Child::aged)
}
