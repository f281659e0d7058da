//! Deterministic extractor tests.

use innkeeper::extractors::heuristic::{HeuristicExtractor, DEFAULT_ADULTS};
use innkeeper::types::{Child, ExtractionMode, Language, Want};

use crate::support::{date, dec};

fn extractor() -> HeuristicExtractor {
    HeuristicExtractor::with_today(date(2026, 10, 19))
}

#[test]
fn serbian_inquiry_is_fully_extracted() {
    let record =
        extractor().parse("2 odrasle, 1 dete (5 god), Hanioti, budžet 70 eur po noći, 15. jul");

    assert_eq!(record.adults, Some(2));
    assert_eq!(record.children, vec![Child::aged(5)]);
    assert_eq!(record.location.as_deref(), Some("Hanioti"));
    assert_eq!(record.region.as_deref(), Some("Halkidiki - Kassandra"));
    assert_eq!(record.budget_per_night, Some(dec(70)));
    // Mid-July is already well behind 19 October, so it rolls into next year.
    assert_eq!(record.date_from, Some(date(2027, 7, 15)));
    assert_eq!(record.date_to, None);
    assert!(record.wants.is_empty());
    assert_eq!(record.language, Language::Sr);
    assert_eq!(record.extraction_mode, ExtractionMode::Fallback);
}

#[test]
fn english_inquiry_with_wants_and_nights() {
    let record = extractor().parse(
        "Hello, we are 3 adults looking for a quiet place with parking near the beach in Sarti, 10.08.2027, 5 nights.",
    );

    assert_eq!(record.adults, Some(3));
    assert_eq!(record.location.as_deref(), Some("Sarti"));
    assert_eq!(record.region.as_deref(), Some("Halkidiki - Sithonia"));
    assert_eq!(record.date_from, Some(date(2027, 8, 10)));
    assert_eq!(record.nights, Some(5));
    assert_eq!(record.date_to, Some(date(2027, 8, 15)));
    assert_eq!(record.wants, vec![Want::NearBeach, Want::Parking, Want::Quiet]);
    assert_eq!(record.language, Language::En);
    assert!(record.children.is_empty());
}

#[test]
fn children_without_ages_are_counted() {
    let record = extractor().parse("2 odrasla i 2 deteta, Polihrono");
    assert_eq!(record.adults, Some(2));
    assert_eq!(record.children, vec![Child::unknown_age(), Child::unknown_age()]);
    assert_eq!(record.children_total(), 2);
    assert!(record.known_child_ages().is_empty());
}

#[test]
fn za_form_sets_adults() {
    let record = extractor().parse("Treba nam smeštaj za 4, Kassandra");
    assert_eq!(record.adults, Some(4));
    assert_eq!(record.location, None);
    assert_eq!(record.region.as_deref(), Some("Halkidiki - Kassandra"));
}

#[test]
fn empty_text_never_fails() {
    let record = extractor().parse("");
    assert_eq!(record.adults, Some(DEFAULT_ADULTS));
    assert_eq!(record.region, None);
    assert_eq!(record.location, None);
    assert_eq!(record.date_from, None);
    assert_eq!(record.budget_per_night, None);
    assert!(record.children.is_empty());
    assert!(record.wants.is_empty());
}

#[test]
fn standalone_ages_keep_duplicates() {
    let record = extractor().parse("2 odrasle, deca 5 god i 5 god, Afitos");
    assert_eq!(record.children, vec![Child::aged(5), Child::aged(5)]);
}

#[test]
fn adult_ages_are_not_children() {
    let record = extractor().parse("Dolazimo sa decom od 4 god i 19 god");
    assert_eq!(record.children, vec![Child::aged(4)]);
}

#[test]
fn impossible_calendar_date_is_dropped() {
    let record = extractor().parse("Hanioti od 31.06. na 7 noći");
    assert_eq!(record.date_from, None);
    assert_eq!(record.date_to, None);
    assert_eq!(record.nights, Some(7));
}

#[test]
fn two_digit_year_is_this_century() {
    let record = extractor().parse("Sarti, 10.08.27, 5 noći");
    assert_eq!(record.date_from, Some(date(2027, 8, 10)));
    assert_eq!(record.date_to, Some(date(2027, 8, 15)));
}

#[test]
fn budget_prefers_per_night_then_keyword_then_currency() {
    let per_night = extractor().parse("Budžet 500 eur ukupno, do 70 eur po noći");
    assert_eq!(per_night.budget_per_night, Some(dec(70)));

    let keyword = extractor().parse("Imamo 300 eur, budžet 60");
    assert_eq!(keyword.budget_per_night, Some(dec(60)));

    let currency = extractor().parse("Cena do €90");
    assert_eq!(currency.budget_per_night, Some(dec(90)));
}

#[test]
fn implausible_night_counts_are_ignored() {
    for text in ["Hanioti, 15.07.2027, 90 noći", "Hanioti, 15.07.2027, 0 noći"] {
        let record = extractor().parse(text);
        assert_eq!(record.nights, None, "{text}");
        assert_eq!(record.date_from, Some(date(2027, 7, 15)));
        assert_eq!(record.date_to, None, "{text}");
    }
}

#[test]
fn oversized_za_count_falls_back_to_default_adults() {
    let record = extractor().parse("Smeštaj za 15, Hanioti");
    assert_eq!(record.adults, Some(DEFAULT_ADULTS));
}

#[test]
fn single_child_without_age() {
    let record = extractor().parse("Sarti, 2 odrasle i 1 dete");
    assert_eq!(record.children, vec![Child::unknown_age()]);

    let english = extractor().parse("Two adults and 1 child, Sarti");
    assert_eq!(english.adults, Some(DEFAULT_ADULTS));
    assert_eq!(english.children, vec![Child::unknown_age()]);
}

#[test]
fn destination_follows_table_order() {
    // Hanioti precedes Pefkohori in the table, whatever the text order.
    let record = extractor().parse("Pefkohori ili Hanioti");
    assert_eq!(record.location.as_deref(), Some("Hanioti"));

    let record = extractor().parse("Kassandra, Hanioti");
    assert_eq!(record.location.as_deref(), Some("Hanioti"));
    assert_eq!(record.region.as_deref(), Some("Halkidiki - Kassandra"));

    let bare = extractor().parse("Tražimo nešto na Sitoniji");
    assert_eq!(bare.location, None);
    assert_eq!(bare.region.as_deref(), Some("Halkidiki - Sithonia"));
}
