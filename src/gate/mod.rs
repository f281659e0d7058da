//! Completeness gate: decides whether an intent record is ready for matching.
//!
//! The gate never fails. Gaps in the inquiry are data, returned as an ordered,
//! deduplicated [`MissingReasons`] list; an empty list authorises matching.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::extractors::lookup::LookupTables;
use crate::types::{IntentRecord, InquiryKind, Language, UnknownValue};

/// One piece of information the guest still has to supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingReason {
    /// The message is not a booking inquiry at all.
    OutOfScope,
    /// Neither an exact date pair nor a window with nights.
    Dates,
    /// No region and no location.
    Destination,
    /// No positive adult count.
    AdultCount,
    /// Declared children without recorded ages.
    ChildrenAges,
}

impl MissingReason {
    /// Stable code used in storage and API payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OutOfScope => "out_of_scope",
            Self::Dates => "dates",
            Self::Destination => "destination",
            Self::AdultCount => "adult_count",
            Self::ChildrenAges => "children_ages",
        }
    }

    /// Guest-facing description in the inquiry's language.
    pub fn text(&self, language: Language) -> &'static str {
        match (self, language) {
            (Self::OutOfScope, Language::Sr) => "Upit se ne odnosi na rezervaciju smeštaja",
            (Self::OutOfScope, Language::En) => {
                "The message is not an accommodation booking inquiry"
            }
            (Self::Dates, Language::Sr) => {
                "Datumi boravka (datum dolaska i odlaska, ili okvirni period i broj noćenja)"
            }
            (Self::Dates, Language::En) => {
                "Travel dates (check-in and check-out, or an approximate window and number of nights)"
            }
            (Self::Destination, Language::Sr) => "Željeno mesto ili region",
            (Self::Destination, Language::En) => "Preferred destination (place or region)",
            (Self::AdultCount, Language::Sr) => "Broj odraslih osoba",
            (Self::AdultCount, Language::En) => "Number of adults",
            (Self::ChildrenAges, Language::Sr) => "Uzrast dece",
            (Self::ChildrenAges, Language::En) => "Ages of the children",
        }
    }
}

impl FromStr for MissingReason {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "out_of_scope" => Ok(Self::OutOfScope),
            "dates" => Ok(Self::Dates),
            "destination" => Ok(Self::Destination),
            "adult_count" => Ok(Self::AdultCount),
            "children_ages" => Ok(Self::ChildrenAges),
            other => Err(UnknownValue {
                field: "missing_reason",
                value: other.to_owned(),
            }),
        }
    }
}

impl fmt::Display for MissingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered set of missing-information reasons.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MissingReasons(Vec<MissingReason>);

impl MissingReasons {
    /// Add a reason unless it is already present. Insertion order is kept.
    pub fn push(&mut self, reason: MissingReason) {
        if !self.0.contains(&reason) {
            self.0.push(reason);
        }
    }

    /// Whether matching may proceed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of reasons.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether a given reason was raised.
    pub fn contains(&self, reason: MissingReason) -> bool {
        self.0.contains(&reason)
    }

    /// Reasons in order.
    pub fn iter(&self) -> impl Iterator<Item = MissingReason> + '_ {
        self.0.iter().copied()
    }

    /// Reasons as guest-facing lines.
    pub fn texts(&self, language: Language) -> Vec<&'static str> {
        self.iter().map(|r| r.text(language)).collect()
    }
}

impl FromIterator<MissingReason> for MissingReasons {
    fn from_iter<I: IntoIterator<Item = MissingReason>>(iter: I) -> Self {
        let mut reasons = Self::default();
        for reason in iter {
            reasons.push(reason);
        }
        reasons
    }
}

/// Context the gate needs besides the record itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct GateContext<'a> {
    /// Original inquiry text.
    pub narrative: &'a str,
}

impl<'a> GateContext<'a> {
    /// Context over the given inquiry text.
    pub fn new(narrative: &'a str) -> Self {
        Self { narrative }
    }

    fn mentions_children(&self) -> bool {
        LookupTables::get().mentions_children(&self.narrative.to_lowercase())
    }
}

/// Decide which pieces of information are still missing.
pub fn detect(intent: &IntentRecord, context: &GateContext<'_>) -> MissingReasons {
    let mut reasons = MissingReasons::default();

    if intent.inquiry_kind == InquiryKind::NonBooking {
        reasons.push(MissingReason::OutOfScope);
        return reasons;
    }

    if !has_dates(intent) {
        reasons.push(MissingReason::Dates);
    }

    if !has_destination(intent) {
        reasons.push(MissingReason::Destination);
    }

    if intent.party_groups.is_empty() {
        check_flat_party(intent, context, &mut reasons);
    } else {
        check_party_groups(intent, context, &mut reasons);
    }

    reasons
}

fn has_dates(intent: &IntentRecord) -> bool {
    let exact_pair = intent.date_from.is_some() && intent.date_to.is_some();
    let window = intent.date_window.is_some() && intent.nights.is_some_and(|n| n > 0);
    exact_pair || window
}

fn has_destination(intent: &IntentRecord) -> bool {
    let filled = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
    filled(&intent.region) || filled(&intent.location)
}

/// Ages are only ever requested for declared children. A narrative that
/// talks about children nobody declared is logged, not asked about.
fn note_undeclared_children(context: &GateContext<'_>) {
    if context.mentions_children() {
        debug!("narrative mentions children but none are declared");
    }
}

fn check_party_groups(
    intent: &IntentRecord,
    context: &GateContext<'_>,
    reasons: &mut MissingReasons,
) {
    let adults_somewhere = intent
        .party_groups
        .iter()
        .any(|g| g.adults.is_some_and(|a| a > 0));
    if !adults_somewhere {
        reasons.push(MissingReason::AdultCount);
    }

    let declares_children = intent.party_groups.iter().any(|g| g.children > 0);
    if !declares_children {
        note_undeclared_children(context);
        return;
    }

    let ages_missing = intent.party_groups.iter().any(|g| {
        let recorded = u32::try_from(g.children_ages.len()).unwrap_or(u32::MAX);
        g.children > 0 && recorded < g.children
    });
    if ages_missing {
        reasons.push(MissingReason::ChildrenAges);
    }
}

fn check_flat_party(intent: &IntentRecord, context: &GateContext<'_>, reasons: &mut MissingReasons) {
    if !intent.adults.is_some_and(|a| a > 0) {
        reasons.push(MissingReason::AdultCount);
    }

    let declared = intent.children_total();
    if declared == 0 {
        note_undeclared_children(context);
        return;
    }

    let known = u32::try_from(intent.known_child_ages().len()).unwrap_or(u32::MAX);
    if known < declared {
        reasons.push(MissingReason::ChildrenAges);
    }
}
