//! Accommodation inventory: units, rooms and date-bounded weekday price tables.
//!
//! Inventory is read-only from the pipeline's point of view. A price of zero
//! (or a missing price) for a weekday means the room cannot be sold that day.

use chrono::{NaiveDate, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Per-weekday prices, Monday first. `None` or zero = not sellable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekdayPrices(pub [Option<Decimal>; 7]);

impl WeekdayPrices {
    /// Same price every day of the week.
    pub fn flat(price: Decimal) -> Self {
        Self([Some(price); 7])
    }

    /// Sellable price for a weekday, or `None` when the day is blocked.
    pub fn for_weekday(&self, day: Weekday) -> Option<Decimal> {
        let idx = usize::try_from(day.num_days_from_monday()).unwrap_or(0);
        self.0
            .get(idx)
            .copied()
            .flatten()
            .filter(|p| *p > Decimal::ZERO)
    }

    /// Lowest sellable price in the table.
    pub fn min_positive(&self) -> Option<Decimal> {
        self.0
            .iter()
            .flatten()
            .copied()
            .filter(|p| *p > Decimal::ZERO)
            .min()
    }
}

/// A date-bounded price table for one occupancy configuration of a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePeriod {
    /// First night covered.
    pub date_from: NaiveDate,
    /// Last night covered (inclusive).
    pub date_to: NaiveDate,
    /// Adults this price applies to; `None` for a default-occupancy row.
    #[serde(default)]
    pub adults: Option<u32>,
    /// Children this price applies to.
    #[serde(default)]
    pub children: u32,
    /// Whether this row is the room's default-occupancy price.
    #[serde(default)]
    pub is_default: bool,
    /// Price per weekday.
    pub prices: WeekdayPrices,
}

impl PricePeriod {
    /// Whether the period covers every night in `[check_in, check_out)`.
    pub fn covers(&self, check_in: NaiveDate, check_out: NaiveDate) -> bool {
        match check_out.pred_opt() {
            Some(last_night) => {
                check_in < check_out && self.date_from <= check_in && self.date_to >= last_night
            }
            None => false,
        }
    }

    /// Whether the row was priced for exactly this party.
    pub fn matches_occupancy(&self, adults: u32, children: u32) -> bool {
        self.adults == Some(adults) && self.children == children
    }
}

/// A bookable room (or sub-unit) of an accommodation unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    /// Room id.
    pub id: i64,
    /// Room title as shown to guests (e.g. `Studio 2+1 sa pogledom na more`).
    pub title: String,
    /// Maximum adults.
    pub max_adults: u32,
    /// Maximum children.
    #[serde(default)]
    pub max_children: u32,
    /// Minimum nights per stay.
    #[serde(default = "default_min_stay")]
    pub min_stay_nights: u32,
    /// Free-text amenity list.
    #[serde(default)]
    pub amenities: String,
    /// Price tables.
    #[serde(default)]
    pub price_periods: Vec<PricePeriod>,
}

fn default_min_stay() -> u32 {
    1
}

impl Room {
    /// Whether the room fits the party and the stay length.
    pub fn accepts(&self, adults: u32, children: u32, nights: i64) -> bool {
        self.max_adults >= adults
            && self.max_children >= children
            && nights >= i64::from(self.min_stay_nights)
    }

    /// Whether the room fits the party, ignoring stay length.
    pub fn fits_party(&self, adults: u32, children: u32) -> bool {
        self.max_adults >= adults && self.max_children >= children
    }

    /// Lowest sellable nightly price across all price periods.
    pub fn reference_price(&self) -> Option<Decimal> {
        self.price_periods
            .iter()
            .filter_map(|p| p.prices.min_positive())
            .min()
    }

    /// Total capacity.
    pub fn capacity(&self) -> u32 {
        self.max_adults.saturating_add(self.max_children)
    }
}

/// A rentable accommodation unit (house, villa, apartment building).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccommodationUnit {
    /// Unit id.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Unit type (`apartman`, `studio`, `vila` ...).
    #[serde(default)]
    pub unit_type: String,
    /// Region name (e.g. `Halkidiki - Kassandra`).
    pub region: String,
    /// Location/settlement name (e.g. `Hanioti`).
    pub location: String,
    /// Stored search priority; higher comes first.
    #[serde(default)]
    pub priority: i64,
    /// Explicit manual order set by an operator; higher comes first.
    #[serde(default)]
    pub manual_order: Option<i64>,
    /// Paid listing / commission partner.
    #[serde(default)]
    pub paid: bool,
    /// Active in the catalogue.
    #[serde(default = "default_true")]
    pub active: bool,
    /// Publicly listed.
    #[serde(default = "default_true")]
    pub listed: bool,
    /// Distance to the beach in metres.
    #[serde(default)]
    pub beach_distance_m: Option<u32>,
    /// Beach type (`pesak`, `šljunak` ...).
    #[serde(default)]
    pub beach_type: Option<String>,
    /// Parking on site.
    #[serde(default)]
    pub parking: Option<bool>,
    /// Pets allowed.
    #[serde(default)]
    pub pets_allowed: Option<bool>,
    /// Qualitative noise level (`mirno`, `centar` ...).
    #[serde(default)]
    pub noise_level: Option<String>,
    /// Free-text availability note.
    #[serde(default)]
    pub availability_note: Option<String>,
    /// Public link to the listing.
    #[serde(default)]
    pub link: Option<String>,
    /// Base nightly price on record, if any.
    #[serde(default)]
    pub base_price: Option<Decimal>,
    /// Free-text amenity description.
    #[serde(default)]
    pub amenities: String,
    /// Rooms.
    #[serde(default)]
    pub rooms: Vec<Room>,
}

fn default_true() -> bool {
    true
}

impl AccommodationUnit {
    /// Inventory-level eligibility: active and either paid or publicly listed.
    pub fn is_eligible(&self) -> bool {
        self.active && (self.paid || self.listed)
    }

    /// Case-insensitive substring match against region or location.
    ///
    /// A requested location is checked against the unit's location first and
    /// falls back to the region, so `Kassandra` finds every unit in that region.
    pub fn matches_destination(&self, region: Option<&str>, location: Option<&str>) -> bool {
        let unit_region = self.region.to_lowercase();
        let unit_location = self.location.to_lowercase();
        let location_ok = location.map(str::trim).filter(|l| !l.is_empty()).map(|l| {
            let needle = l.to_lowercase();
            unit_location.contains(&needle) || unit_region.contains(&needle)
        });
        let region_ok = region.map(str::trim).filter(|r| !r.is_empty()).map(|r| {
            let needle = r.to_lowercase();
            unit_region.contains(&needle)
                || (!unit_region.is_empty() && needle.contains(&unit_region))
        });
        match (location_ok, region_ok) {
            (Some(loc), _) => loc,
            (None, Some(reg)) => reg,
            (None, None) => true,
        }
    }

    /// Whether a base price is on record (unit-level or any room).
    pub fn has_base_price(&self) -> bool {
        self.base_price.is_some_and(|p| p > Decimal::ZERO)
            || self.rooms.iter().any(|r| r.reference_price().is_some())
    }

    /// Largest room capacity (adults + children).
    pub fn max_capacity(&self) -> u32 {
        self.rooms.iter().map(Room::capacity).max().unwrap_or(0)
    }
}
