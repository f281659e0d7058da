//! Tier construction tests over a small Kassandra inventory.

use std::collections::BTreeSet;

use innkeeper::inventory::AccommodationUnit;
use innkeeper::ranking::{suggest, TierPolicy};
use innkeeper::types::IntentRecord;
use rust_decimal::Decimal;

use crate::support::{date, dec, kassandra_inventory, room, unit, KASSANDRA};

fn hanioti_week() -> IntentRecord {
    IntentRecord {
        region: Some(KASSANDRA.to_owned()),
        location: Some("Hanioti".to_owned()),
        date_from: Some(date(2027, 7, 15)),
        date_to: Some(date(2027, 7, 22)),
        adults: Some(2),
        budget_per_night: Some(dec(80)),
        ..IntentRecord::default()
    }
}

fn names(candidates: &[innkeeper::matcher::Candidate]) -> Vec<&str> {
    candidates.iter().map(|c| c.unit.name.as_str()).collect()
}

#[test]
fn exact_match_is_primary_and_region_fills_alternatives() {
    let suggestions = suggest(&kassandra_inventory(), &hanioti_week(), &TierPolicy::default());

    assert_eq!(names(&suggestions.primary), vec!["Vila Sunce"]);
    assert_eq!(suggestions.primary[0].total_price, Some(dec(420)));
    assert_eq!(names(&suggestions.alternatives), vec!["Apartmani More"]);
    assert!(suggestions.has_any());

    assert_eq!(suggestions.log.len(), 3);
    assert!(suggestions.log[0].starts_with("matcher: 1 candidate(s) for 2027-07-15..2027-07-22"));
    assert!(suggestions.log[2].starts_with("tiers: 1 primary, 1 alternative"));
}

#[test]
fn no_dates_skips_matcher_but_still_suggests() {
    let intent = IntentRecord {
        date_from: None,
        date_to: None,
        ..hanioti_week()
    };
    let suggestions = suggest(&kassandra_inventory(), &intent, &TierPolicy::default());

    assert!(suggestions.primary.is_empty());
    assert_eq!(suggestions.log[0], "matcher: skipped, no resolvable date range");
    assert_eq!(
        names(&suggestions.alternatives),
        vec!["Vila Sunce", "Apartmani More"]
    );
}

#[test]
fn extreme_values_degrade_instead_of_panicking() {
    let endless = IntentRecord {
        date_to: None,
        nights: Some(u32::MAX),
        budget_per_night: Some(Decimal::MAX),
        ..hanioti_week()
    };
    let suggestions = suggest(&kassandra_inventory(), &endless, &TierPolicy::default());
    assert!(suggestions.primary.is_empty());
    assert_eq!(
        names(&suggestions.alternatives),
        vec!["Vila Sunce", "Apartmani More"]
    );

    // A ceiling too large to multiply out does not filter.
    let unbounded = IntentRecord {
        budget_per_night: Some(Decimal::MAX),
        ..hanioti_week()
    };
    let suggestions = suggest(&kassandra_inventory(), &unbounded, &TierPolicy::default());
    assert_eq!(names(&suggestions.primary), vec!["Vila Sunce"]);
}

#[test]
fn nothing_in_an_unknown_region() {
    let intent = IntentRecord {
        region: Some("Tasos".to_owned()),
        location: Some("Limenas".to_owned()),
        ..hanioti_week()
    };
    let suggestions = suggest(&kassandra_inventory(), &intent, &TierPolicy::default());
    assert!(!suggestions.has_any());
}

#[test]
fn tiers_are_disjoint_and_capped() {
    let units: Vec<AccommodationUnit> = (1..=6)
        .map(|id| {
            unit(
                id,
                &format!("Vila {id}"),
                "Hanioti",
                KASSANDRA,
                vec![room(id * 10, "Studio", 2, 0, 50 + id)],
            )
        })
        .collect();
    let policy = TierPolicy {
        primary_cap: 2,
        alternative_cap: 3,
        ..TierPolicy::default()
    };

    let suggestions = suggest(&units, &hanioti_week(), &policy);
    assert_eq!(names(&suggestions.primary), vec!["Vila 1", "Vila 2"]);
    assert_eq!(
        names(&suggestions.alternatives),
        vec!["Vila 3", "Vila 4", "Vila 5"]
    );

    let primary: BTreeSet<i64> = suggestions.primary.iter().map(|c| c.unit.id).collect();
    assert!(suggestions
        .alternatives
        .iter()
        .all(|c| !primary.contains(&c.unit.id)));
}

#[test]
fn budget_limits_primary_but_slack_keeps_alternatives() {
    let intent = IntentRecord {
        budget_per_night: Some(dec(50)),
        ..hanioti_week()
    };
    let suggestions = suggest(&kassandra_inventory(), &intent, &TierPolicy::default());

    // 60 per night is over budget for an exact match but inside the slack.
    assert!(suggestions.primary.is_empty());
    assert_eq!(names(&suggestions.alternatives), vec!["Vila Sunce"]);
}
