//! Core inquiry types: raw inbound messages and the structured intent record.
//!
//! Everything here is plain data. The extractor produces an [`IntentRecord`],
//! the gate reads it, the matcher and ranking engine consume it.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Number of body characters that participate in the dedupe hash.
pub const DEDUPE_BODY_PREFIX_CHARS: usize = 500;

/// Highest age still treated as a child.
pub const MAX_CHILD_AGE: u8 = 17;

/// Plausible stay lengths, in nights.
pub const NIGHTS_RANGE: std::ops::RangeInclusive<u32> = 1..=60;

/// Largest nightly budget taken from an inquiry.
pub const MAX_BUDGET_PER_NIGHT: u32 = 100_000;

// ---------------------------------------------------------------------------
// Raw inbound message
// ---------------------------------------------------------------------------

/// An immutable inbound message as delivered by a mailbox or folder source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMessage {
    /// External message id (e.g. the `Message-ID` header), when known.
    #[serde(default)]
    pub external_id: Option<String>,
    /// Subject line.
    #[serde(default)]
    pub subject: String,
    /// Sender address, optionally with a display name (`"Ana <ana@example.com>"`).
    pub sender: String,
    /// When the message was received.
    pub received_at: DateTime<Utc>,
    /// Raw header map.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Plain-text body.
    #[serde(default)]
    pub body: String,
}

impl RawMessage {
    /// Stable dedupe key: SHA-256 over id, sender, subject, received time and body prefix.
    pub fn dedupe_hash(&self) -> String {
        let body_prefix: String = self.body.chars().take(DEDUPE_BODY_PREFIX_CHARS).collect();
        let mut hasher = Sha256::new();
        for part in [
            self.external_id.as_deref().unwrap_or_default(),
            self.sender.as_str(),
            self.subject.as_str(),
            &self.received_at.to_rfc3339(),
            body_prefix.as_str(),
        ] {
            hasher.update(part.as_bytes());
            hasher.update([0x1f]);
        }
        hex::encode(hasher.finalize())
    }

    /// Bare address part of the sender (`ana@example.com`).
    pub fn sender_address(&self) -> String {
        match (self.sender.find('<'), self.sender.rfind('>')) {
            (Some(start), Some(end)) if start < end => {
                self.sender[start.saturating_add(1)..end].trim().to_lowercase()
            }
            _ => self.sender.trim().to_lowercase(),
        }
    }

    /// Display name part of the sender, if one was given.
    pub fn sender_name(&self) -> Option<String> {
        let start = self.sender.find('<')?;
        let name = self.sender[..start].trim().trim_matches('"').trim();
        (!name.is_empty()).then(|| name.to_owned())
    }

    /// Text handed to the extractor: subject and body.
    pub fn inquiry_text(&self) -> String {
        if self.subject.trim().is_empty() {
            self.body.clone()
        } else {
            format!("{}\n\n{}", self.subject.trim(), self.body)
        }
    }
}

// ---------------------------------------------------------------------------
// Vocabularies
// ---------------------------------------------------------------------------

/// Language of the inquiry; drives reply templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Serbian.
    #[default]
    Sr,
    /// English.
    En,
}

impl Language {
    /// Stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sr => "sr",
            Self::En => "en",
        }
    }
}

impl FromStr for Language {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sr" => Ok(Self::Sr),
            "en" => Ok(Self::En),
            other => Err(UnknownValue::new("language", other)),
        }
    }
}

/// Which extraction strategy produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    /// Language-model strategy.
    Ai,
    /// Deterministic heuristic strategy.
    #[default]
    Fallback,
}

impl ExtractionMode {
    /// Stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ai => "ai",
            Self::Fallback => "fallback",
        }
    }
}

impl FromStr for ExtractionMode {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ai" => Ok(Self::Ai),
            "fallback" => Ok(Self::Fallback),
            other => Err(UnknownValue::new("extraction_mode", other)),
        }
    }
}

/// Canonical amenity wishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Want {
    /// Close to the beach.
    NearBeach,
    /// Parking available.
    Parking,
    /// Quiet surroundings.
    Quiet,
    /// Swimming pool.
    Pool,
    /// Pets allowed.
    PetsAllowed,
    /// Wi-Fi.
    Wifi,
    /// Air conditioning.
    AirConditioning,
}

impl Want {
    /// Every tag, in canonical order.
    pub const ALL: [Want; 7] = [
        Self::NearBeach,
        Self::Parking,
        Self::Quiet,
        Self::Pool,
        Self::PetsAllowed,
        Self::Wifi,
        Self::AirConditioning,
    ];

    /// Wire form of the tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NearBeach => "near-beach",
            Self::Parking => "parking",
            Self::Quiet => "quiet",
            Self::Pool => "pool",
            Self::PetsAllowed => "pets-allowed",
            Self::Wifi => "wifi",
            Self::AirConditioning => "air-conditioning",
        }
    }
}

impl FromStr for Want {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|w| w.as_str() == normalized)
            .ok_or_else(|| UnknownValue::new("want", s))
    }
}

impl fmt::Display for Want {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse classification of what the sender is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InquiryKind {
    /// An accommodation booking inquiry.
    #[default]
    Booking,
    /// Anything else (invoices, newsletters, complaints about a past stay ...).
    NonBooking,
}

/// A string did not name any known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {field} value: {value:?}")]
pub struct UnknownValue {
    /// Which vocabulary was being parsed.
    pub field: &'static str,
    /// The offending input.
    pub value: String,
}

impl UnknownValue {
    fn new(field: &'static str, value: &str) -> Self {
        Self {
            field,
            value: value.to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// Intent record
// ---------------------------------------------------------------------------

/// One child in the party. `age` is `None` when the sender did not say.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Child {
    /// Age in years, bounded to 0–17.
    pub age: Option<u8>,
}

impl Child {
    /// A child of known age; ages above 17 are dropped to `None`.
    pub fn aged(age: u8) -> Self {
        Self {
            age: (age <= MAX_CHILD_AGE).then_some(age),
        }
    }

    /// A child whose age is not known.
    pub fn unknown_age() -> Self {
        Self { age: None }
    }
}

/// Structured party data for one travelling group (one room/unit request).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyGroup {
    /// Adults in the group, if stated.
    #[serde(default)]
    pub adults: Option<u32>,
    /// Number of children declared for the group.
    #[serde(default)]
    pub children: u32,
    /// Ages recorded for the group's children.
    #[serde(default)]
    pub children_ages: Vec<u8>,
}

/// A fuzzy stay window: "around the anchor date, give or take tolerance days".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    /// Preferred check-in date.
    pub anchor: NaiveDate,
    /// Acceptable shift in days either way.
    pub tolerance_days: u32,
}

/// Structured booking intent extracted from free text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntentRecord {
    /// What kind of message this is.
    #[serde(default)]
    pub inquiry_kind: InquiryKind,
    /// Broad destination (e.g. `Halkidiki - Kassandra`).
    #[serde(default)]
    pub region: Option<String>,
    /// Specific place within the region (e.g. `Hanioti`).
    #[serde(default)]
    pub location: Option<String>,
    /// Exact check-in date.
    #[serde(default)]
    pub date_from: Option<NaiveDate>,
    /// Exact check-out date.
    #[serde(default)]
    pub date_to: Option<NaiveDate>,
    /// Fuzzy window, used when no exact pair is known.
    #[serde(default)]
    pub date_window: Option<DateWindow>,
    /// Number of nights.
    #[serde(default)]
    pub nights: Option<u32>,
    /// Adults in the party.
    #[serde(default)]
    pub adults: Option<u32>,
    /// Children in the party, in mention order.
    #[serde(default)]
    pub children: Vec<Child>,
    /// Declared number of children, when stated separately from ages.
    #[serde(default)]
    pub children_count: Option<u32>,
    /// Per-group party data, when the sender travels as several groups.
    #[serde(default)]
    pub party_groups: Vec<PartyGroup>,
    /// Budget ceiling per night.
    #[serde(default)]
    pub budget_per_night: Option<Decimal>,
    /// Amenity wishes, deduplicated, in discovery order.
    #[serde(default)]
    pub wants: Vec<Want>,
    /// Language of the inquiry.
    #[serde(default)]
    pub language: Language,
    /// Strategy that produced this record.
    #[serde(default)]
    pub extraction_mode: ExtractionMode,
}

impl IntentRecord {
    /// Exact check-in/check-out pair, derived from nights when only check-in is known.
    pub fn resolved_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.date_from, self.date_to, self.nights) {
            (Some(from), Some(to), _) => Some((from, to)),
            (Some(from), None, Some(nights)) if nights > 0 => {
                Some((from, from.checked_add_days(Days::new(u64::from(nights)))?))
            }
            _ => None,
        }
    }

    /// Stay to price: the exact range, else `nights` from the window anchor.
    pub fn stay_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        if let Some(range) = self.resolved_range() {
            return Some(range);
        }
        let anchor = self.date_window?.anchor;
        let nights = self.nights.filter(|n| *n > 0)?;
        Some((anchor, anchor.checked_add_days(Days::new(u64::from(nights)))?))
    }

    /// Nights for the stay: explicit value first, else the span of the exact pair.
    pub fn resolved_nights(&self) -> Option<i64> {
        if let Some(nights) = self.nights {
            return Some(i64::from(nights));
        }
        match (self.date_from, self.date_to) {
            (Some(from), Some(to)) => Some(to.signed_duration_since(from).num_days()),
            _ => None,
        }
    }

    /// Number of children, taking the larger of the declared count and the list length.
    pub fn children_total(&self) -> u32 {
        let listed = u32::try_from(self.children.len()).unwrap_or(u32::MAX);
        self.children_count.unwrap_or(0).max(listed)
    }

    /// Children with a known age.
    pub fn known_child_ages(&self) -> Vec<u8> {
        self.children.iter().filter_map(|c| c.age).collect()
    }

    /// Adults across the whole party (per-group data wins when present).
    pub fn total_adults(&self) -> Option<u32> {
        if self.party_groups.is_empty() {
            return self.adults;
        }
        let sum = self
            .party_groups
            .iter()
            .filter_map(|g| g.adults)
            .fold(0u32, u32::saturating_add);
        Some(sum)
    }

    /// Keep only canonical, deduplicated wants and bounded ages.
    pub fn normalize(&mut self) {
        let mut seen = Vec::with_capacity(self.wants.len());
        for want in self.wants.drain(..) {
            if !seen.contains(&want) {
                seen.push(want);
            }
        }
        self.wants = seen;
        for child in &mut self.children {
            if child.age.is_some_and(|a| a > MAX_CHILD_AGE) {
                child.age = None;
            }
        }
        for field in [&mut self.region, &mut self.location] {
            if field.as_deref().is_some_and(|v| v.trim().is_empty()) {
                *field = None;
            }
        }
    }
}
