//! Ranking engine: relevance scoring, total ordering and tier split.
//!
//! Sort keys, each breaking ties of the previous one:
//! 1. manual order, descending, units without one last
//! 2. paid listing first
//! 3. relevance score, descending
//! 4. the unit's lowest nightly price in the pool, ascending (unpriced last)
//! 5. unit id, then room id, ascending

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::extractors::lookup::LookupTables;
use crate::inventory::{AccommodationUnit, Room};
use crate::matcher::{self, Candidate};
use crate::types::{Child, IntentRecord, Want};

/// Score for a matching requested location.
pub const LOCATION_SCORE: i64 = 30;
/// Score for a matching requested region (only without a requested location).
pub const REGION_SCORE: i64 = 15;
/// Score per satisfied want.
pub const WANT_SCORE: i64 = 7;
/// Score for a unit with any base price on record.
pub const BASE_PRICE_SCORE: i64 = 1;

/// Price used for unpriced units so they sort after every priced one.
pub const UNPRICED_SENTINEL: Decimal = Decimal::MAX;

/// Relevance query: the subset of an intent that drives search and scoring.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Requested region.
    #[serde(default)]
    pub region: Option<String>,
    /// Requested location.
    #[serde(default)]
    pub location: Option<String>,
    /// Adults.
    #[serde(default)]
    pub adults: Option<u32>,
    /// Children.
    #[serde(default)]
    pub children: Vec<Child>,
    /// Budget ceiling per night.
    #[serde(default)]
    pub budget_per_night: Option<Decimal>,
    /// Amenity wishes.
    #[serde(default)]
    pub wants: Vec<Want>,
}

impl From<&IntentRecord> for SearchQuery {
    fn from(intent: &IntentRecord) -> Self {
        Self {
            region: intent.region.clone(),
            location: intent.location.clone(),
            adults: intent.total_adults(),
            children: intent.children.clone(),
            budget_per_night: intent.budget_per_night,
            wants: intent.wants.clone(),
        }
    }
}

fn requested(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_lowercase)
}

/// Relevance score of a candidate for a query.
pub fn score(candidate: &Candidate, query: &SearchQuery) -> i64 {
    let mut total: i64 = 0;

    match (requested(&query.location), requested(&query.region)) {
        (Some(location), _) => {
            if candidate.unit.location.to_lowercase().contains(&location) {
                total = total.saturating_add(LOCATION_SCORE);
            }
        }
        (None, Some(region)) => {
            if candidate.unit.region.to_lowercase().contains(&region) {
                total = total.saturating_add(REGION_SCORE);
            }
        }
        (None, None) => {}
    }

    let haystack = format!("{} {}", candidate.room.title, candidate.room.amenities).to_lowercase();
    let tables = LookupTables::get();
    let wants: BTreeSet<Want> = query.wants.iter().copied().collect();
    for want in wants {
        if tables.mentions_want(want, &haystack) {
            total = total.saturating_add(WANT_SCORE);
        }
    }

    if candidate.unit.has_base_price {
        total = total.saturating_add(BASE_PRICE_SCORE);
    }
    total
}

fn manual_order_cmp(a: Option<i64>, b: Option<i64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Score and sort candidates, then cap the list.
pub fn rank(mut candidates: Vec<Candidate>, query: &SearchQuery, cap: usize) -> Vec<Candidate> {
    for candidate in &mut candidates {
        candidate.score = score(candidate, query);
    }

    let mut unit_min_price: BTreeMap<i64, Decimal> = BTreeMap::new();
    for candidate in &candidates {
        if let Some(price) = candidate.price_key() {
            unit_min_price
                .entry(candidate.unit.id)
                .and_modify(|p| *p = (*p).min(price))
                .or_insert(price);
        }
    }
    let min_price = |c: &Candidate| {
        unit_min_price
            .get(&c.unit.id)
            .copied()
            .unwrap_or(UNPRICED_SENTINEL)
    };

    candidates.sort_by(|a, b| {
        manual_order_cmp(a.unit.manual_order, b.unit.manual_order)
            .then_with(|| b.unit.paid.cmp(&a.unit.paid))
            .then_with(|| b.score.cmp(&a.score))
            .then_with(|| min_price(a).cmp(&min_price(b)))
            .then_with(|| a.unit.id.cmp(&b.unit.id))
            .then_with(|| a.room.id.cmp(&b.room.id))
    });
    candidates.truncate(cap);
    candidates
}

/// Relaxed relevance search: destination, party fit and a slackened budget.
///
/// No dates and no minimum stay. One candidate per unit (its cheapest
/// fitting room), ranked and capped.
pub fn search(
    units: &[AccommodationUnit],
    query: &SearchQuery,
    budget_slack: Decimal,
    cap: usize,
) -> Vec<Candidate> {
    let adults = query.adults.unwrap_or(1).max(1);
    let children = u32::try_from(query.children.len()).unwrap_or(u32::MAX);
    let ceiling = query.budget_per_night.map(|b| b.saturating_add(budget_slack));
    // A location request still searches its whole region here.
    let (region, location) = match (requested(&query.region), requested(&query.location)) {
        (Some(region), _) => (Some(region), None),
        (None, location) => (None, location),
    };

    let mut pool = Vec::new();
    for unit in units.iter().filter(|u| u.is_eligible()) {
        if !unit.matches_destination(region.as_deref(), location.as_deref()) {
            continue;
        }
        let best: Option<&Room> = unit
            .rooms
            .iter()
            .filter(|r| r.fits_party(adults, children))
            .filter(|r| match (ceiling, r.reference_price()) {
                (Some(max), Some(price)) => price <= max,
                _ => true,
            })
            .min_by(|a, b| {
                let pa = a.reference_price().unwrap_or(UNPRICED_SENTINEL);
                let pb = b.reference_price().unwrap_or(UNPRICED_SENTINEL);
                pa.cmp(&pb).then(a.id.cmp(&b.id))
            });
        if let Some(room) = best {
            pool.push(Candidate::unpriced(unit, room));
        }
    }
    rank(pool, query, cap)
}

/// Caps and tolerances for building suggestion tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierPolicy {
    /// Matcher cap.
    pub match_limit: usize,
    /// Relevance pool cap.
    pub search_cap: usize,
    /// Primary tier cap.
    pub primary_cap: usize,
    /// Alternative tier cap.
    pub alternative_cap: usize,
    /// Budget slack for the relevance pool.
    pub budget_slack: Decimal,
}

impl Default for TierPolicy {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

impl From<&PipelineConfig> for TierPolicy {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            match_limit: config.match_limit,
            search_cap: config.search_cap,
            primary_cap: config.primary_cap,
            alternative_cap: config.alternative_cap,
            budget_slack: Decimal::from(config.search_budget_slack),
        }
    }
}

/// Tiered suggestion payload stored on a pipeline item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestions {
    /// Exact matches for dates, party and budget.
    pub primary: Vec<Candidate>,
    /// Next-best units from the relaxed search.
    pub alternatives: Vec<Candidate>,
    /// Diagnostic lines describing how the tiers were built.
    pub log: Vec<String>,
}

impl Suggestions {
    /// Whether any candidate was found in either tier.
    pub fn has_any(&self) -> bool {
        !self.primary.is_empty() || !self.alternatives.is_empty()
    }
}

/// Build primary and alternative tiers for an intent.
pub fn suggest(units: &[AccommodationUnit], intent: &IntentRecord, policy: &TierPolicy) -> Suggestions {
    let query = SearchQuery::from(intent);
    let mut log = Vec::new();

    let matched = matcher::match_intent(units, intent, policy.match_limit);
    log.push(match intent.stay_range() {
        Some((from, to)) => format!(
            "matcher: {} candidate(s) for {from}..{to}, limit {}",
            matched.len(),
            policy.match_limit
        ),
        None => "matcher: skipped, no resolvable date range".to_owned(),
    });
    let primary = rank(matched, &query, policy.primary_cap);

    let primary_units: BTreeSet<i64> = primary.iter().map(|c| c.unit.id).collect();
    let pool = search(units, &query, policy.budget_slack, policy.search_cap);
    log.push(format!(
        "search: {} unit(s) in relaxed pool, budget slack {}",
        pool.len(),
        policy.budget_slack
    ));
    let alternatives: Vec<Candidate> = pool
        .into_iter()
        .filter(|c| !primary_units.contains(&c.unit.id))
        .take(policy.alternative_cap)
        .collect();
    log.push(format!(
        "tiers: {} primary, {} alternative(s)",
        primary.len(),
        alternatives.len()
    ));

    Suggestions {
        primary,
        alternatives,
        log,
    }
}
