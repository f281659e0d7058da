//! Static lookup tables for the heuristic extractor.
//!
//! Tables are built once per process and never mutated. Order matters:
//! the first matching entry wins, so specific places precede bare regions.

use std::sync::LazyLock;

use crate::types::Want;

/// A canonical destination resolved from a place-name substring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    /// Specific location, `None` for a bare region mention.
    pub location: Option<&'static str>,
    /// Canonical region.
    pub region: &'static str,
}

/// One row of the place table.
#[derive(Debug, Clone)]
struct PlaceEntry {
    needle: &'static str,
    destination: Destination,
}

const KASSANDRA: &str = "Halkidiki - Kassandra";
const SITHONIA: &str = "Halkidiki - Sithonia";
const ATHOS: &str = "Halkidiki - Athos";
const HALKIDIKI: &str = "Halkidiki";
const OLYMPIC_RIVIERA: &str = "Olympic Riviera";
const THASSOS: &str = "Thassos";
const STRYMONIAN: &str = "Stavros - Asprovalta";

/// `(needle, location, region)`; needles are lowercase.
const PLACES: &[(&str, &str, &str)] = &[
    ("hanioti", "Hanioti", KASSANDRA),
    ("pefkohori", "Pefkohori", KASSANDRA),
    ("pefkochori", "Pefkohori", KASSANDRA),
    ("polihrono", "Polihrono", KASSANDRA),
    ("polychrono", "Polihrono", KASSANDRA),
    ("kallithea", "Kallithea", KASSANDRA),
    ("kalitea", "Kallithea", KASSANDRA),
    ("kriopigi", "Kriopigi", KASSANDRA),
    ("afitos", "Afitos", KASSANDRA),
    ("afytos", "Afitos", KASSANDRA),
    ("nea fokea", "Nea Fokea", KASSANDRA),
    ("fokea", "Nea Fokea", KASSANDRA),
    ("siviri", "Siviri", KASSANDRA),
    ("fourka", "Fourka", KASSANDRA),
    ("furka", "Fourka", KASSANDRA),
    ("paliouri", "Paliouri", KASSANDRA),
    ("paliuri", "Paliouri", KASSANDRA),
    ("skioni", "Nea Skioni", KASSANDRA),
    ("potidea", "Nea Potidea", KASSANDRA),
    ("potideja", "Nea Potidea", KASSANDRA),
    ("kassandria", "Kassandria", KASSANDRA),
    ("nikiti", "Nikiti", SITHONIA),
    ("marmaras", "Neos Marmaras", SITHONIA),
    ("sarti", "Sarti", SITHONIA),
    ("vourvourou", "Vourvourou", SITHONIA),
    ("vurvuru", "Vourvourou", SITHONIA),
    ("toroni", "Toroni", SITHONIA),
    ("porto koufo", "Porto Koufo", SITHONIA),
    ("ouranoupoli", "Ouranoupoli", ATHOS),
    ("uranopoli", "Ouranoupoli", ATHOS),
    ("ierissos", "Ierissos", ATHOS),
    ("jerisos", "Ierissos", ATHOS),
    ("paralia", "Paralia", OLYMPIC_RIVIERA),
    ("leptokarija", "Leptokarija", OLYMPIC_RIVIERA),
    ("leptokaria", "Leptokarija", OLYMPIC_RIVIERA),
    ("leptokarya", "Leptokarija", OLYMPIC_RIVIERA),
    ("nei pori", "Nei Pori", OLYMPIC_RIVIERA),
    ("platamon", "Platamonas", OLYMPIC_RIVIERA),
    ("olympic beach", "Olympic Beach", OLYMPIC_RIVIERA),
    ("limenaria", "Limenaria", THASSOS),
    ("limenas", "Limenas", THASSOS),
    ("potos", "Potos", THASSOS),
    ("prinos", "Skala Prinos", THASSOS),
    ("golden beach", "Golden Beach", THASSOS),
    ("asprovalta", "Asprovalta", STRYMONIAN),
    ("stavros", "Stavros", STRYMONIAN),
    ("vrasna", "Nea Vrasna", STRYMONIAN),
];

/// `(needle, region)` for bare region mentions.
const REGIONS: &[(&str, &str)] = &[
    ("kassandr", KASSANDRA),
    ("kasandr", KASSANDRA),
    ("sithoni", SITHONIA),
    ("sitonij", SITHONIA),
    ("olimpsk", OLYMPIC_RIVIERA),
    ("olympic riviera", OLYMPIC_RIVIERA),
    ("thassos", THASSOS),
    ("tasos", THASSOS),
    ("halkidik", HALKIDIKI),
    ("chalkidik", HALKIDIKI),
];

/// Keyword sets per amenity tag, checked in [`Want::ALL`] order.
const WANT_KEYWORDS: &[(Want, &[&str])] = &[
    (
        Want::NearBeach,
        &[
            "blizu plaž",
            "blizu plaz",
            "blizu mora",
            "do plaže",
            "do plaze",
            "prvi red",
            "near the beach",
            "near beach",
            "close to the beach",
            "beachfront",
            "first row",
        ],
    ),
    (Want::Parking, &["parking", "parkir", "garaž", "garaz"]),
    (
        Want::Quiet,
        &["mirn", "tišin", "tisin", "tiho ", "tihom", "quiet", "peaceful"],
    ),
    (Want::Pool, &["bazen", "pool"]),
    (
        Want::PetsAllowed,
        &[
            "ljubim",
            "sa psom",
            "kuče",
            "pet friendly",
            "pet-friendly",
            "pets",
            "with a dog",
            "our dog",
            "my dog",
        ],
    ),
    (Want::Wifi, &["wifi", "wi-fi", "wi fi", "internet"]),
    (
        Want::AirConditioning,
        &["klima", "air condition", "air-condition", "a/c", "aircon"],
    ),
];

/// Words whose presence marks an inquiry as English.
const ENGLISH_KEYWORDS: &[&str] = &[
    "hello",
    "dear",
    "we are",
    "we would",
    "would like",
    "looking for",
    "adults",
    "children",
    "nights",
    "please",
    "thank you",
    "availability",
    "booking",
];

/// Words that indicate children are part of the trip.
const CHILD_KEYWORDS: &[&str] = &[
    "dete", "deca", "dece", "deci", "djec", "dijete", "beb", "child", "kid", "baby", "toddler",
];

/// Immutable lookup tables shared by every extraction.
#[derive(Debug)]
pub struct LookupTables {
    places: Vec<PlaceEntry>,
    wants: Vec<(Want, Vec<&'static str>)>,
    english: Vec<&'static str>,
    child_words: Vec<&'static str>,
}

static TABLES: LazyLock<LookupTables> = LazyLock::new(LookupTables::build);

impl LookupTables {
    /// Process-wide tables.
    pub fn get() -> &'static LookupTables {
        &TABLES
    }

    fn build() -> Self {
        let mut places: Vec<PlaceEntry> = PLACES
            .iter()
            .map(|&(needle, location, region)| PlaceEntry {
                needle,
                destination: Destination {
                    location: Some(location),
                    region,
                },
            })
            .collect();
        places.extend(REGIONS.iter().map(|&(needle, region)| PlaceEntry {
            needle,
            destination: Destination {
                location: None,
                region,
            },
        }));
        Self {
            places,
            wants: WANT_KEYWORDS
                .iter()
                .map(|(want, words)| (*want, words.to_vec()))
                .collect(),
            english: ENGLISH_KEYWORDS.to_vec(),
            child_words: CHILD_KEYWORDS.to_vec(),
        }
    }

    /// First destination whose needle occurs in the lowercased text.
    pub fn destination(&self, lower: &str) -> Option<&Destination> {
        self.places
            .iter()
            .find(|entry| lower.contains(entry.needle))
            .map(|entry| &entry.destination)
    }

    /// Amenity tags mentioned in the lowercased text, in table order.
    pub fn wants(&self, lower: &str) -> Vec<Want> {
        self.wants
            .iter()
            .filter(|(_, words)| words.iter().any(|w| lower.contains(w)))
            .map(|(want, _)| *want)
            .collect()
    }

    /// Whether any amenity keyword of `want` occurs in the lowercased text.
    pub fn mentions_want(&self, want: Want, lower: &str) -> bool {
        self.wants
            .iter()
            .filter(|(w, _)| *w == want)
            .any(|(_, words)| words.iter().any(|k| lower.contains(k)))
    }

    /// Whether the lowercased text contains an English marker word.
    pub fn looks_english(&self, lower: &str) -> bool {
        self.english.iter().any(|k| lower.contains(k))
    }

    /// Whether the lowercased text talks about children at all.
    pub fn mentions_children(&self, lower: &str) -> bool {
        self.child_words.iter().any(|k| lower.contains(k))
    }
}
