//! Fixed reply wording per language.

use crate::types::Language;

/// Every phrase the deterministic templates use.
#[derive(Debug)]
pub struct Phrasebook {
    pub(crate) greeting_named: &'static str,
    pub(crate) greeting_anonymous: &'static str,
    pub(crate) thanks: &'static str,
    pub(crate) summary_heading: &'static str,
    pub(crate) destination: &'static str,
    pub(crate) dates: &'static str,
    pub(crate) around: &'static str,
    pub(crate) nights: &'static str,
    pub(crate) party: &'static str,
    pub(crate) adults: &'static str,
    pub(crate) children: &'static str,
    pub(crate) ages: &'static str,
    pub(crate) budget: &'static str,
    pub(crate) budget_up_to: &'static str,
    pub(crate) per_night: &'static str,
    pub(crate) total: &'static str,
    pub(crate) offer_heading: &'static str,
    pub(crate) unit_type: &'static str,
    pub(crate) up_to_persons: &'static str,
    pub(crate) price: &'static str,
    pub(crate) beach: &'static str,
    pub(crate) metres_from_beach: &'static str,
    pub(crate) parking: &'static str,
    pub(crate) pets: &'static str,
    pub(crate) yes: &'static str,
    pub(crate) no: &'static str,
    pub(crate) surroundings: &'static str,
    pub(crate) note: &'static str,
    pub(crate) offer_call_to_action: &'static str,
    pub(crate) provisional_prices: &'static str,
    pub(crate) missing_heading: &'static str,
    pub(crate) missing_call_to_action: &'static str,
    pub(crate) no_match: &'static str,
    pub(crate) alternatives_heading: &'static str,
    pub(crate) flexibility_heading: &'static str,
    pub(crate) flexibility_questions: [&'static str; 3],
    pub(crate) sign_off: &'static str,
    pub(crate) date_format: &'static str,
}

static SERBIAN: Phrasebook = Phrasebook {
    greeting_named: "Poštovani/a",
    greeting_anonymous: "Poštovani,",
    thanks: "hvala Vam na upitu.",
    summary_heading: "Na osnovu Vašeg upita tražili smo:",
    destination: "Destinacija",
    dates: "Termin",
    around: "oko",
    nights: "noćenja",
    party: "Osobe",
    adults: "odraslih",
    children: "dece",
    ages: "uzrast",
    budget: "Budžet",
    budget_up_to: "do",
    per_night: "po noći",
    total: "ukupno",
    offer_heading: "Izdvojili smo sledeće smeštaje:",
    unit_type: "Tip",
    up_to_persons: "do {} osoba",
    price: "Cena",
    beach: "Plaža",
    metres_from_beach: "{} m od plaže",
    parking: "Parking",
    pets: "Kućni ljubimci",
    yes: "da",
    no: "ne",
    surroundings: "Okruženje",
    note: "Napomena",
    offer_call_to_action: "Ukoliko Vam se neka od ponuda dopada, odgovorite na ovu poruku i rezervisaćemo smeštaj.",
    provisional_prices: "Cene su informativne i važe uz konačnu proveru raspoloživosti.",
    missing_heading: "Da bismo Vam poslali ponudu, potrebni su nam još sledeći podaci:",
    missing_call_to_action: "Čim nam ih pošaljete, javićemo Vam se sa predlozima smeštaja.",
    no_match: "Nažalost, za tražene kriterijume trenutno nemamo smeštaj koji u potpunosti odgovara.",
    alternatives_heading: "Izdvojili smo nekoliko alternativa koje bi Vas mogle zanimati:",
    flexibility_heading: "Kako bismo pronašli najbolju opciju, molimo Vas da nam odgovorite:",
    flexibility_questions: [
        "Da li biste razmotrili i obližnja mesta?",
        "Da li su datumi fleksibilni za 2-3 dana ranije ili kasnije?",
        "Da li možete da povećate budžet ili razmotrite drugi tip smeštaja?",
    ],
    sign_off: "Srdačan pozdrav,",
    date_format: "%d.%m.%Y.",
};

static ENGLISH: Phrasebook = Phrasebook {
    greeting_named: "Dear",
    greeting_anonymous: "Hello,",
    thanks: "thank you for your inquiry.",
    summary_heading: "Based on your request we searched for:",
    destination: "Destination",
    dates: "Dates",
    around: "around",
    nights: "nights",
    party: "Guests",
    adults: "adults",
    children: "children",
    ages: "ages",
    budget: "Budget",
    budget_up_to: "up to",
    per_night: "per night",
    total: "total",
    offer_heading: "We have selected the following accommodation:",
    unit_type: "Type",
    up_to_persons: "up to {} guests",
    price: "Price",
    beach: "Beach",
    metres_from_beach: "{} m from the beach",
    parking: "Parking",
    pets: "Pets",
    yes: "yes",
    no: "no",
    surroundings: "Surroundings",
    note: "Note",
    offer_call_to_action: "If you like one of the offers, reply to this message and we will make the reservation.",
    provisional_prices: "Prices are provisional and subject to a final availability check.",
    missing_heading: "To prepare an offer we still need the following details:",
    missing_call_to_action: "As soon as you send them, we will get back to you with suggestions.",
    no_match: "Unfortunately we currently have no accommodation that fully matches your criteria.",
    alternatives_heading: "Here are a few alternatives you might like:",
    flexibility_heading: "To find the best option for you, please let us know:",
    flexibility_questions: [
        "Would you consider nearby locations?",
        "Are your dates flexible by 2-3 days either way?",
        "Could you extend the budget or consider a different type of accommodation?",
    ],
    sign_off: "Kind regards,",
    date_format: "%d %b %Y",
};

/// Phrasebook for a language.
pub fn for_language(language: Language) -> &'static Phrasebook {
    match language {
        Language::Sr => &SERBIAN,
        Language::En => &ENGLISH,
    }
}
