//! Deterministic template tests.

use rust_decimal::Decimal;

use innkeeper::composer::{money, render, DraftInput, OutcomeKind, MAX_LISTED_ALTERNATIVES};
use innkeeper::gate::{MissingReason, MissingReasons};
use innkeeper::matcher::{match_intent, Candidate};
use innkeeper::ranking::Suggestions;
use innkeeper::types::{IntentRecord, Language};

use crate::support::{date, dec, kassandra_inventory, room, unit, KASSANDRA};

fn hanioti_week(language: Language) -> IntentRecord {
    IntentRecord {
        region: Some(KASSANDRA.to_owned()),
        location: Some("Hanioti".to_owned()),
        date_from: Some(date(2027, 7, 15)),
        date_to: Some(date(2027, 7, 22)),
        adults: Some(2),
        language,
        ..IntentRecord::default()
    }
}

fn input<'a>(
    intent: &'a IntentRecord,
    candidates: &'a [Candidate],
    outcome: OutcomeKind,
    missing: &'a MissingReasons,
) -> DraftInput<'a> {
    DraftInput {
        intent,
        guest_name: Some("Ana"),
        candidates,
        outcome,
        missing,
        known_unit_names: &[],
    }
}

#[test]
fn missing_info_lists_exactly_the_reasons() {
    let intent = IntentRecord {
        date_from: None,
        date_to: None,
        ..hanioti_week(Language::Sr)
    };
    let missing: MissingReasons = [MissingReason::Dates, MissingReason::AdultCount]
        .into_iter()
        .collect();
    let candidates = match_intent(&kassandra_inventory(), &hanioti_week(Language::Sr), 10);

    let body = render(&input(&intent, &candidates, OutcomeKind::MissingInfo, &missing));

    assert!(body.starts_with("Poštovani/a Ana,"));
    let bullets: Vec<&str> = body.lines().filter(|l| l.starts_with("- ")).collect();
    assert_eq!(bullets.len(), 2);
    assert!(bullets[0].contains("Datumi boravka"));
    assert!(!body.contains("Vila Sunce"));
    assert!(body.ends_with("Srdačan pozdrav,"));
}

#[test]
fn english_offer_shows_summary_and_prices() {
    let intent = hanioti_week(Language::En);
    let candidates = match_intent(&kassandra_inventory(), &intent, 10);
    assert_eq!(candidates.len(), 1);
    let missing = MissingReasons::default();

    let body = render(&input(&intent, &candidates, OutcomeKind::Offer, &missing));

    assert!(body.starts_with("Dear Ana,"));
    assert!(body.contains("- Destination: Hanioti, Halkidiki - Kassandra"));
    assert!(body.contains("- Dates: 15 Jul 2027 - 22 Jul 2027 (7 nights)"));
    assert!(body.contains("- Guests: 2 adults"));
    assert!(body.contains("1. Vila Sunce - Hanioti, Halkidiki - Kassandra"));
    assert!(body.contains("   Price: 420 € total (60 € per night)"));
    assert!(body.contains("   Beach: 150 m from the beach, pesak"));
    assert!(body.contains("   Parking: yes"));
    assert!(body.contains("Prices are provisional"));
    assert!(body.ends_with("Kind regards,"));
}

#[test]
fn anonymous_greeting_without_name() {
    let intent = hanioti_week(Language::Sr);
    let missing = MissingReasons::default();
    let draft = DraftInput {
        guest_name: Some("   "),
        ..input(&intent, &[], OutcomeKind::NoMatchAtAll, &missing)
    };
    assert!(render(&draft).starts_with("Poštovani,\n"));
}

#[test]
fn no_match_asks_about_flexibility() {
    let intent = hanioti_week(Language::En);
    let missing = MissingReasons::default();

    let body = render(&input(&intent, &[], OutcomeKind::NoMatchAtAll, &missing));

    assert!(body.contains("Unfortunately we currently have no accommodation"));
    assert!(!body.contains("alternatives you might like"));
    assert!(body.contains("- Would you consider nearby locations?"));
    assert!(body.contains("- Are your dates flexible by 2-3 days either way?"));
}

#[test]
fn alternatives_are_capped_and_linked() {
    let intent = hanioti_week(Language::En);
    let missing = MissingReasons::default();
    let units: Vec<_> = (1..=7)
        .map(|id| {
            let mut u = unit(
                id,
                &format!("Vila {id}"),
                "Hanioti",
                KASSANDRA,
                vec![room(id * 10, "Studio", 2, 0, 50)],
            );
            u.link = Some(format!("https://example.com/vila-{id}"));
            u
        })
        .collect();
    let candidates: Vec<Candidate> = units
        .iter()
        .map(|u| Candidate::unpriced(u, &u.rooms[0]))
        .collect();

    let body = render(&input(
        &intent,
        &candidates,
        OutcomeKind::NoPrimaryWithAlternatives,
        &missing,
    ));

    assert!(body.contains(
        "1. Vila 1 (Hanioti, Halkidiki - Kassandra) - 50 € per night - https://example.com/vila-1"
    ));
    assert!(body.contains(&format!("{MAX_LISTED_ALTERNATIVES}. Vila 5")));
    assert!(!body.contains("Vila 6"));
}

#[test]
fn money_drops_zero_cents() {
    assert_eq!(money(dec(60)), "60");
    assert_eq!(money(Decimal::new(4200, 2)), "42");
    assert_eq!(money(Decimal::new(605, 1)), "60.50");
    assert_eq!(money(Decimal::new(123_456, 3)), "123.46");
}

#[test]
fn outcome_follows_gate_then_tiers() {
    let inventory = kassandra_inventory();
    let sunce = Candidate::unpriced(&inventory[0], &inventory[0].rooms[0]);
    let with_primary = Suggestions {
        primary: vec![sunce.clone()],
        ..Suggestions::default()
    };
    let with_alternatives = Suggestions {
        alternatives: vec![sunce],
        ..Suggestions::default()
    };
    let none = MissingReasons::default();
    let dates: MissingReasons = std::iter::once(MissingReason::Dates).collect();

    assert_eq!(OutcomeKind::derive(&dates, Some(&with_primary)), OutcomeKind::MissingInfo);
    assert_eq!(OutcomeKind::derive(&none, Some(&with_primary)), OutcomeKind::Offer);
    assert_eq!(
        OutcomeKind::derive(&none, Some(&with_alternatives)),
        OutcomeKind::NoPrimaryWithAlternatives
    );
    assert_eq!(
        OutcomeKind::derive(&none, Some(&Suggestions::default())),
        OutcomeKind::NoMatchAtAll
    );
    assert_eq!(OutcomeKind::derive(&none, None), OutcomeKind::NoMatchAtAll);
}

#[test]
fn outcome_round_trips_its_stored_name() {
    for kind in [
        OutcomeKind::Offer,
        OutcomeKind::MissingInfo,
        OutcomeKind::NoPrimaryWithAlternatives,
        OutcomeKind::NoMatchAtAll,
    ] {
        assert_eq!(kind.as_str().parse::<OutcomeKind>().expect("known outcome"), kind);
    }
    assert!("maybe".parse::<OutcomeKind>().is_err());
}
