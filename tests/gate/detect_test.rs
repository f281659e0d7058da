//! Completeness gate tests.

use innkeeper::gate::{detect, GateContext, MissingReason};
use innkeeper::types::{Child, DateWindow, InquiryKind, IntentRecord, Language, PartyGroup};

use crate::support::date;

fn complete() -> IntentRecord {
    IntentRecord {
        location: Some("Hanioti".to_owned()),
        date_from: Some(date(2027, 7, 15)),
        date_to: Some(date(2027, 7, 22)),
        adults: Some(2),
        ..IntentRecord::default()
    }
}

fn reasons(intent: &IntentRecord, narrative: &str) -> Vec<MissingReason> {
    detect(intent, &GateContext::new(narrative)).iter().collect()
}

#[test]
fn empty_record_reports_in_fixed_order() {
    assert_eq!(
        reasons(&IntentRecord::default(), ""),
        vec![
            MissingReason::Dates,
            MissingReason::Destination,
            MissingReason::AdultCount,
        ]
    );
}

#[test]
fn complete_record_passes() {
    assert!(detect(&complete(), &GateContext::new("")).is_empty());
}

#[test]
fn region_alone_is_a_destination() {
    let intent = IntentRecord {
        location: None,
        region: Some("Halkidiki - Kassandra".to_owned()),
        ..complete()
    };
    assert!(reasons(&intent, "").is_empty());

    let blank = IntentRecord {
        location: Some("  ".to_owned()),
        ..complete()
    };
    assert_eq!(reasons(&blank, ""), vec![MissingReason::Destination]);
}

#[test]
fn window_needs_nights() {
    let window = DateWindow {
        anchor: date(2027, 7, 15),
        tolerance_days: 3,
    };
    let without_nights = IntentRecord {
        date_from: None,
        date_to: None,
        date_window: Some(window),
        ..complete()
    };
    assert_eq!(reasons(&without_nights, ""), vec![MissingReason::Dates]);

    let with_nights = IntentRecord {
        nights: Some(7),
        ..without_nights
    };
    assert!(reasons(&with_nights, "").is_empty());
}

#[test]
fn check_in_without_check_out_is_incomplete() {
    let intent = IntentRecord {
        date_to: None,
        ..complete()
    };
    assert_eq!(reasons(&intent, ""), vec![MissingReason::Dates]);
}

#[test]
fn zero_adults_is_missing() {
    let intent = IntentRecord {
        adults: Some(0),
        ..complete()
    };
    assert_eq!(reasons(&intent, ""), vec![MissingReason::AdultCount]);
}

#[test]
fn children_need_every_age() {
    let intent = IntentRecord {
        children: vec![Child::aged(4), Child::unknown_age()],
        ..complete()
    };
    assert_eq!(reasons(&intent, ""), vec![MissingReason::ChildrenAges]);

    let counted = IntentRecord {
        children: vec![Child::aged(4)],
        children_count: Some(2),
        ..complete()
    };
    assert_eq!(reasons(&counted, ""), vec![MissingReason::ChildrenAges]);

    let all_known = IntentRecord {
        children: vec![Child::aged(4), Child::aged(9)],
        ..complete()
    };
    assert!(reasons(&all_known, "").is_empty());
}

#[test]
fn undeclared_children_are_never_asked_about() {
    for narrative in [
        "Dolazimo autom iz Beograda",
        "Hanioti, 2 odrasle, bez dece, od 15.07.2027. 7 noći",
        "Putujemo i sa dvoje dece",
        "Two adults and a toddler",
    ] {
        assert_eq!(reasons(&complete(), narrative), Vec::<MissingReason>::new(), "{narrative}");
    }

    let grouped = IntentRecord {
        adults: None,
        party_groups: vec![PartyGroup {
            adults: Some(2),
            children: 0,
            children_ages: Vec::new(),
        }],
        ..complete()
    };
    assert!(reasons(&grouped, "bez dece").is_empty());
}

#[test]
fn party_groups_are_checked_per_group() {
    let groups = IntentRecord {
        adults: None,
        party_groups: vec![
            PartyGroup {
                adults: Some(2),
                children: 1,
                children_ages: vec![7],
            },
            PartyGroup {
                adults: Some(2),
                children: 2,
                children_ages: vec![3],
            },
        ],
        ..complete()
    };
    assert_eq!(reasons(&groups, ""), vec![MissingReason::ChildrenAges]);

    let no_adults = IntentRecord {
        adults: None,
        party_groups: vec![PartyGroup::default()],
        ..complete()
    };
    assert_eq!(reasons(&no_adults, ""), vec![MissingReason::AdultCount]);
}

#[test]
fn non_booking_short_circuits() {
    let intent = IntentRecord {
        inquiry_kind: InquiryKind::NonBooking,
        ..IntentRecord::default()
    };
    assert_eq!(reasons(&intent, ""), vec![MissingReason::OutOfScope]);
}

#[test]
fn reason_texts_follow_language() {
    let missing = detect(&IntentRecord::default(), &GateContext::new(""));
    assert_eq!(
        missing.texts(Language::En).first().copied(),
        Some(MissingReason::Dates.text(Language::En))
    );
    assert!(missing.texts(Language::Sr)[0].starts_with("Datumi boravka"));
}
