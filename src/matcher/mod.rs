//! Availability matcher: intent in, priced candidates out.
//!
//! A pure function over an inventory snapshot. A room qualifies when it fits
//! the party, satisfies the minimum stay and has a positive price for every
//! night of the stay; the total is the sum of those nightly prices.

use chrono::{Datelike, Days, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::inventory::{AccommodationUnit, PricePeriod, Room};
use crate::types::IntentRecord;

/// Unit fields carried on every candidate (snapshot, not a live reference).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSummary {
    /// Unit id.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Unit type.
    pub unit_type: String,
    /// Region.
    pub region: String,
    /// Location.
    pub location: String,
    /// Manual order; higher first, `None` last.
    pub manual_order: Option<i64>,
    /// Paid listing.
    pub paid: bool,
    /// Any base price on record.
    pub has_base_price: bool,
    /// Largest room capacity.
    pub max_capacity: u32,
    /// Distance to the beach in metres.
    pub beach_distance_m: Option<u32>,
    /// Beach type label.
    pub beach_type: Option<String>,
    /// Parking on site.
    pub parking: Option<bool>,
    /// Pets allowed.
    pub pets_allowed: Option<bool>,
    /// Noise level label.
    pub noise_level: Option<String>,
    /// Free-text availability note.
    pub availability_note: Option<String>,
    /// Public link.
    pub link: Option<String>,
}

impl From<&AccommodationUnit> for UnitSummary {
    fn from(unit: &AccommodationUnit) -> Self {
        Self {
            id: unit.id,
            name: unit.name.clone(),
            unit_type: unit.unit_type.clone(),
            region: unit.region.clone(),
            location: unit.location.clone(),
            manual_order: unit.manual_order,
            paid: unit.paid,
            has_base_price: unit.has_base_price(),
            max_capacity: unit.max_capacity(),
            beach_distance_m: unit.beach_distance_m,
            beach_type: unit.beach_type.clone(),
            parking: unit.parking,
            pets_allowed: unit.pets_allowed,
            noise_level: unit.noise_level.clone(),
            availability_note: unit.availability_note.clone(),
            link: unit.link.clone(),
        }
    }
}

/// Room fields carried on every candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummary {
    /// Room id.
    pub id: i64,
    /// Title.
    pub title: String,
    /// Maximum adults.
    pub max_adults: u32,
    /// Maximum children.
    pub max_children: u32,
    /// Amenity text of the room and its unit, used for wants scoring.
    pub amenities: String,
    /// Lowest sellable nightly price on record.
    pub reference_price: Option<Decimal>,
}

impl RoomSummary {
    fn new(unit: &AccommodationUnit, room: &Room) -> Self {
        let amenities = [unit.amenities.as_str(), room.amenities.as_str()]
            .into_iter()
            .filter(|s| !s.trim().is_empty())
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            id: room.id,
            title: room.title.clone(),
            max_adults: room.max_adults,
            max_children: room.max_children,
            amenities,
            reference_price: room.reference_price(),
        }
    }
}

/// A unit/room pair, priced for the requested stay when dates were known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Unit snapshot.
    pub unit: UnitSummary,
    /// Room snapshot.
    pub room: RoomSummary,
    /// Nights priced.
    pub nights: Option<u32>,
    /// Total for the stay.
    pub total_price: Option<Decimal>,
    /// Average per night.
    pub per_night: Option<Decimal>,
    /// Relevance score assigned by ranking.
    #[serde(default)]
    pub score: i64,
}

impl Candidate {
    /// Candidate without a stay price (relevance search).
    pub fn unpriced(unit: &AccommodationUnit, room: &Room) -> Self {
        Self {
            unit: UnitSummary::from(unit),
            room: RoomSummary::new(unit, room),
            nights: None,
            total_price: None,
            per_night: None,
            score: 0,
        }
    }

    /// Nightly price used for comparisons: the stay average, else the room's
    /// reference price.
    pub fn price_key(&self) -> Option<Decimal> {
        self.per_night.or(self.room.reference_price)
    }
}

/// A priced stay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StayPrice {
    /// Sum of nightly prices.
    pub total: Decimal,
    /// Total divided by nights, rounded to cents.
    pub per_night: Decimal,
}

/// Search the inventory for rooms that can host the stay.
///
/// A fuzzy window is priced from its anchor. Returns an empty list when the
/// record has no stay range, no positive adult count, or a non-positive night
/// count. Units are visited in
/// priority order (descending, then id) and the search stops at `limit`.
pub fn match_intent(
    units: &[AccommodationUnit],
    intent: &IntentRecord,
    limit: usize,
) -> Vec<Candidate> {
    let Some((check_in, _)) = intent.stay_range() else {
        return Vec::new();
    };
    let Some(adults) = intent.total_adults().filter(|a| *a > 0) else {
        return Vec::new();
    };
    let Some(nights) = intent.resolved_nights().filter(|n| *n > 0) else {
        return Vec::new();
    };
    let Some(check_out) = u64::try_from(nights)
        .ok()
        .and_then(|n| check_in.checked_add_days(Days::new(n)))
    else {
        return Vec::new();
    };
    let children = intent.children_total();
    let nights_u32 = u32::try_from(nights).ok();

    let mut eligible: Vec<&AccommodationUnit> = units
        .iter()
        .filter(|u| u.is_eligible())
        .filter(|u| u.matches_destination(intent.region.as_deref(), intent.location.as_deref()))
        .collect();
    eligible.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.id.cmp(&b.id)));

    let mut out = Vec::new();
    if limit == 0 {
        return out;
    }
    for unit in eligible {
        for room in &unit.rooms {
            if !room.accepts(adults, children, nights) {
                continue;
            }
            let Some(price) = price_stay(room, adults, children, check_in, check_out) else {
                continue;
            };
            if let Some(ceiling) = intent.budget_per_night {
                // A ceiling too large to multiply out filters nothing.
                if ceiling
                    .checked_mul(Decimal::from(nights))
                    .is_some_and(|max| price.total > max)
                {
                    continue;
                }
            }
            let mut candidate = Candidate::unpriced(unit, room);
            candidate.nights = nights_u32;
            candidate.total_price = Some(price.total);
            candidate.per_night = Some(price.per_night);
            out.push(candidate);
            if out.len() >= limit {
                return out;
            }
        }
    }
    out
}

/// Pick the price period for a stay: an exact-occupancy period covering the
/// whole span, else a default-occupancy one.
pub fn select_period(
    room: &Room,
    adults: u32,
    children: u32,
    check_in: NaiveDate,
    check_out: NaiveDate,
) -> Option<&PricePeriod> {
    let covering = || {
        room.price_periods
            .iter()
            .filter(move |p| p.covers(check_in, check_out))
    };
    covering()
        .find(|p| p.matches_occupancy(adults, children))
        .or_else(|| covering().find(|p| p.is_default))
}

/// Price every night in `[check_in, check_out)`. Any unpriced night rejects
/// the whole stay.
pub fn price_stay(
    room: &Room,
    adults: u32,
    children: u32,
    check_in: NaiveDate,
    check_out: NaiveDate,
) -> Option<StayPrice> {
    let period = select_period(room, adults, children, check_in, check_out)?;
    let mut total = Decimal::ZERO;
    let mut nights = 0u32;
    for day in check_in.iter_days().take_while(|d| *d < check_out) {
        total = total.checked_add(period.prices.for_weekday(day.weekday())?)?;
        nights = nights.checked_add(1)?;
    }
    if nights == 0 {
        return None;
    }
    Some(StayPrice {
        total,
        per_night: total.checked_div(Decimal::from(nights))?.round_dp(2),
    })
}
