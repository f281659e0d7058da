//! Deterministic keyword/regex extractor.
//!
//! This is the behavioural baseline: it must never fail, and absent
//! information maps to `None`/empty. Every pattern is compiled once; a pattern
//! that fails to compile simply never matches.

use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{Datelike, Duration, NaiveDate, Utc};
use regex::{Captures, Regex};
use rust_decimal::Decimal;

use super::lookup::LookupTables;
use super::{ExtractError, IntentExtractor};
use crate::types::{Child, ExtractionMode, IntentRecord, Language, MAX_CHILD_AGE, NIGHTS_RANGE};

/// Adults assumed when the text does not say.
pub const DEFAULT_ADULTS: u32 = 2;

/// Bounds for the `za N` adult form.
const ZA_ADULTS_RANGE: std::ops::RangeInclusive<u32> = 1..=10;

/// A month-name date further in the past than this rolls over to next year.
const ROLLOVER_GRACE_DAYS: i64 = 60;

struct Patterns {
    adults: Option<Regex>,
    za_count: Option<Regex>,
    child_explicit: Option<Regex>,
    child_age: Option<Regex>,
    child_count: Option<Regex>,
    budget_per_night: Option<Regex>,
    budget_keyword: Option<Regex>,
    budget_currency: Option<Regex>,
    nights: Option<Regex>,
    numeric_date: Option<Regex>,
    month_date: Option<Regex>,
}

const CHILD_WORDS: &str = r"(?:dete|deteta|dece|deca|djece|djeca|dijete|child|children|kids?)";
const AGE_UNITS: &str = r"(?:god\w*|g\.|yrs?\b|years?\b|y\.o\.?)";
const AMOUNT: &str = r"(\d{2,5}(?:[.,]\d{1,2})?)";

static PATTERNS: LazyLock<Patterns> = LazyLock::new(|| {
    let compile = |pattern: String| Regex::new(&pattern).ok();
    Patterns {
        adults: compile(r"(?i)\b(\d{1,2})\s*(?:odrasl\w*|adults?\b)".to_owned()),
        za_count: compile(r"(?i)\bza\s+(\d{1,2})\b".to_owned()),
        child_explicit: compile(format!(
            r"(?i)\b(\d{{1,2}})\s*{CHILD_WORDS}\s*\(\s*(\d{{1,2}})\s*{AGE_UNITS}?\s*\)"
        )),
        child_age: compile(format!(r"(?i)\b(\d{{1,2}})\s*{AGE_UNITS}")),
        child_count: compile(format!(r"(?i)\b(\d{{1,2}})\s*{CHILD_WORDS}\b")),
        budget_per_night: compile(format!(
            r"(?i){AMOUNT}\s*(?:€|eur\w*|evr\w*)?\s*(?:po\s+no[cć]\w*|per\s+night|a\s+night|/\s*no[cć]\w*|/\s*night|nightly)"
        )),
        budget_keyword: compile(format!(
            r"(?i)(?:bud[žz]et\w*|budget|up\s+to|maksimalno|maksimum|max\.?)\s*(?:je|is|of|oko|around|do)?\s*:?\s*(?:€\s*)?{AMOUNT}"
        )),
        budget_currency: compile(format!(
            r"(?i)(?:€\s*{AMOUNT})|(?:\b{AMOUNT}\s*(?:€|eur\w*|evr\w*))"
        )),
        nights: compile(r"(?i)\b(\d{1,2})\s*(?:no[cć]\w*|night\w*)".to_owned()),
        numeric_date: compile(
            r"\b(0?[1-9]|[12]\d|3[01])\.\s?(0?[1-9]|1[0-2])(?:\.(?:(\d{4}|\d{2})\b|\s(\d{4})\b)?|\b)"
                .to_owned(),
        ),
        month_date: compile(
            r"(?i)\b(0?[1-9]|[12]\d|3[01])\.?\s*(jan(?:uar\w*|\.|\b)|feb(?:ruar\w*|\.|\b)|mar(?:t\w*|ch|\.|\b)|apr(?:il\w*|\.|\b)|maj\w*|may\b|jun\w*|jul\w*|avg\w*|aug\w*|sep(?:t\w*|\.|\b)|okt\w*|oct\w*|nov(?:emb\w*|\.|\b)|dec(?:emb\w*|\.|\b)|dek(?:emb\w*|\.|\b))"
                .to_owned(),
        ),
    }
});

/// Deterministic extractor. `today` anchors year resolution for partial dates.
#[derive(Debug, Clone, Copy)]
pub struct HeuristicExtractor {
    today: Option<NaiveDate>,
}

impl Default for HeuristicExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl HeuristicExtractor {
    /// Extractor that resolves partial dates against the current UTC date.
    pub fn new() -> Self {
        Self { today: None }
    }

    /// Extractor with a pinned "today" (tests, replays).
    pub fn with_today(today: NaiveDate) -> Self {
        Self { today: Some(today) }
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Utc::now().date_naive())
    }

    /// Extract an intent record. Never fails.
    pub fn parse(&self, text: &str) -> IntentRecord {
        let lower = text.to_lowercase();
        let tables = LookupTables::get();
        let p = &*PATTERNS;

        let (location, region) = match tables.destination(&lower) {
            Some(dest) => (dest.location.map(str::to_owned), Some(dest.region.to_owned())),
            None => (None, None),
        };

        let nights = first_number(p.nights.as_ref(), text).filter(|n| NIGHTS_RANGE.contains(n));
        let date_from = extract_check_in(p, text, self.today());
        let date_to = match (date_from, nights) {
            (Some(from), Some(n)) => from.checked_add_signed(Duration::days(i64::from(n))),
            _ => None,
        };

        let mut record = IntentRecord {
            region,
            location,
            date_from,
            date_to,
            nights,
            adults: Some(extract_adults(p, text)),
            children: extract_children(p, text),
            budget_per_night: extract_budget(p, text),
            wants: tables.wants(&lower),
            language: if tables.looks_english(&lower) {
                Language::En
            } else {
                Language::Sr
            },
            extraction_mode: ExtractionMode::Fallback,
            ..IntentRecord::default()
        };
        record.normalize();
        record
    }
}

#[async_trait::async_trait]
impl IntentExtractor for HeuristicExtractor {
    fn name(&self) -> &str {
        "extractor:heuristic"
    }

    async fn extract(&self, text: &str) -> Result<IntentRecord, ExtractError> {
        Ok(self.parse(text))
    }
}

fn capture_u32(caps: &Captures<'_>, idx: usize) -> Option<u32> {
    caps.get(idx).and_then(|m| m.as_str().parse().ok())
}

fn first_number(re: Option<&Regex>, text: &str) -> Option<u32> {
    re?.captures(text).and_then(|c| capture_u32(&c, 1))
}

fn extract_adults(p: &Patterns, text: &str) -> u32 {
    if let Some(n) = first_number(p.adults.as_ref(), text) {
        return n;
    }
    first_number(p.za_count.as_ref(), text)
        .filter(|n| ZA_ADULTS_RANGE.contains(n))
        .unwrap_or(DEFAULT_ADULTS)
}

fn extract_children(p: &Patterns, text: &str) -> Vec<Child> {
    // "2 dece (5 god)" expands to two children aged 5.
    if let Some(re) = p.child_explicit.as_ref() {
        let explicit: Vec<Child> = re
            .captures_iter(text)
            .filter_map(|c| Some((capture_u32(&c, 1)?, capture_u32(&c, 2)?)))
            .flat_map(|(count, age)| {
                let age = u8::try_from(age).unwrap_or(u8::MAX);
                let count = usize::try_from(count).unwrap_or(0);
                std::iter::repeat(Child::aged(age)).take(count)
            })
            .collect();
        if !explicit.is_empty() {
            return explicit;
        }
    }

    if let Some(re) = p.child_age.as_ref() {
        let ages: Vec<Child> = re
            .captures_iter(text)
            .filter_map(|c| capture_u32(&c, 1))
            .filter_map(|age| u8::try_from(age).ok())
            .filter(|age| *age <= MAX_CHILD_AGE)
            .map(Child::aged)
            .collect();
        if !ages.is_empty() {
            return ages;
        }
    }

    let count = first_number(p.child_count.as_ref(), text).unwrap_or(0);
    let count = usize::try_from(count).unwrap_or(0);
    vec![Child::unknown_age(); count]
}

fn parse_amount(raw: &str) -> Option<Decimal> {
    Decimal::from_str(&raw.replace(',', ".")).ok()
}

fn extract_budget(p: &Patterns, text: &str) -> Option<Decimal> {
    for re in [&p.budget_per_night, &p.budget_keyword].into_iter().flatten() {
        if let Some(amount) = re
            .captures(text)
            .and_then(|c| c.get(1))
            .and_then(|m| parse_amount(m.as_str()))
        {
            return Some(amount);
        }
    }
    // Either alternative of the currency pattern may carry the amount.
    p.budget_currency
        .as_ref()?
        .captures(text)
        .and_then(|c| c.get(1).or_else(|| c.get(2)))
        .and_then(|m| parse_amount(m.as_str()))
}

fn extract_check_in(p: &Patterns, text: &str, today: NaiveDate) -> Option<NaiveDate> {
    if let Some(caps) = p.numeric_date.as_ref().and_then(|re| re.captures(text)) {
        let day = capture_u32(&caps, 1)?;
        let month = capture_u32(&caps, 2)?;
        let year = capture_u32(&caps, 3).or_else(|| capture_u32(&caps, 4));
        return match year {
            Some(y) if y < 100 => {
                NaiveDate::from_ymd_opt(i32::try_from(y).ok()?.saturating_add(2000), month, day)
            }
            Some(y) => NaiveDate::from_ymd_opt(i32::try_from(y).ok()?, month, day),
            None => resolve_year(day, month, today),
        };
    }

    let caps = p.month_date.as_ref()?.captures(text)?;
    let day = capture_u32(&caps, 1)?;
    let month = month_number(caps.get(2)?.as_str())?;
    resolve_year(day, month, today)
}

/// Place a day/month in the current year, rolling to next year when the date
/// is already well in the past. Impossible dates yield `None`.
pub fn resolve_year(day: u32, month: u32, today: NaiveDate) -> Option<NaiveDate> {
    let this_year = NaiveDate::from_ymd_opt(today.year(), month, day)?;
    if today.signed_duration_since(this_year).num_days() > ROLLOVER_GRACE_DAYS {
        NaiveDate::from_ymd_opt(today.year().saturating_add(1), month, day)
    } else {
        Some(this_year)
    }
}

fn month_number(word: &str) -> Option<u32> {
    let w = word.to_lowercase();
    let table: [(&[&str], u32); 12] = [
        (&["jan"], 1),
        (&["feb"], 2),
        (&["mar"], 3),
        (&["apr"], 4),
        (&["maj", "may"], 5),
        (&["jun"], 6),
        (&["jul"], 7),
        (&["avg", "aug"], 8),
        (&["sep"], 9),
        (&["okt", "oct"], 10),
        (&["nov"], 11),
        (&["dec", "dek"], 12),
    ];
    table
        .iter()
        .find(|(prefixes, _)| prefixes.iter().any(|p| w.starts_with(p)))
        .map(|(_, n)| *n)
}
