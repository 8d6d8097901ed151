//! US state and country tables.

use crate::text::{REGION_LIMIT, truncate_chars};

/// The 50 states plus DC, as (code, name).
pub const US_STATES: &[(&str, &str)] = &[
    ("AL", "Alabama"),
    ("AK", "Alaska"),
    ("AZ", "Arizona"),
    ("AR", "Arkansas"),
    ("CA", "California"),
    ("CO", "Colorado"),
    ("CT", "Connecticut"),
    ("DE", "Delaware"),
    ("FL", "Florida"),
    ("GA", "Georgia"),
    ("HI", "Hawaii"),
    ("ID", "Idaho"),
    ("IL", "Illinois"),
    ("IN", "Indiana"),
    ("IA", "Iowa"),
    ("KS", "Kansas"),
    ("KY", "Kentucky"),
    ("LA", "Louisiana"),
    ("ME", "Maine"),
    ("MD", "Maryland"),
    ("MA", "Massachusetts"),
    ("MI", "Michigan"),
    ("MN", "Minnesota"),
    ("MS", "Mississippi"),
    ("MO", "Missouri"),
    ("MT", "Montana"),
    ("NE", "Nebraska"),
    ("NV", "Nevada"),
    ("NH", "New Hampshire"),
    ("NJ", "New Jersey"),
    ("NM", "New Mexico"),
    ("NY", "New York"),
    ("NC", "North Carolina"),
    ("ND", "North Dakota"),
    ("OH", "Ohio"),
    ("OK", "Oklahoma"),
    ("OR", "Oregon"),
    ("PA", "Pennsylvania"),
    ("RI", "Rhode Island"),
    ("SC", "South Carolina"),
    ("SD", "South Dakota"),
    ("TN", "Tennessee"),
    ("TX", "Texas"),
    ("UT", "Utah"),
    ("VT", "Vermont"),
    ("VA", "Virginia"),
    ("WA", "Washington"),
    ("WV", "West Virginia"),
    ("WI", "Wisconsin"),
    ("WY", "Wyoming"),
    ("DC", "District of Columbia"),
];

/// Spellings of the United States accepted in a country field (upper-case).
pub const US_COUNTRY_SPELLINGS: &[&str] = &[
    "US",
    "USA",
    "UNITED STATES",
    "UNITED STATES OF AMERICA",
    "U.S.",
    "U.S.A.",
];

/// Whether `code` (any case) is a US state or DC code.
pub fn is_us_state_code(code: &str) -> bool {
    let code = code.trim();
    US_STATES
        .iter()
        .any(|(c, _)| c.eq_ignore_ascii_case(code))
}

/// Look up a state code by full name, case-insensitively.
pub fn state_code_for_name(name: &str) -> Option<&'static str> {
    let name = name.trim();
    US_STATES
        .iter()
        .find(|(_, n)| n.eq_ignore_ascii_case(name))
        .map(|(c, _)| *c)
}

/// Whether an already upper-cased, trimmed country value means the US.
pub fn is_us_country(country_upper: &str) -> bool {
    US_COUNTRY_SPELLINGS.contains(&country_upper)
}

/// Reduce a state value to a two-letter code where possible.
///
/// Any two-letter alphabetic value is upper-cased as-is; full US state names
/// map to their code; anything else passes through capped at 20 characters.
pub fn normalize_state(state: &str) -> String {
    let state = state.trim();
    if state.is_empty() {
        return String::new();
    }
    if state.len() == 2 && state.chars().all(|c| c.is_ascii_alphabetic()) {
        return state.to_ascii_uppercase();
    }
    match state_code_for_name(state) {
        Some(code) => code.to_string(),
        None => truncate_chars(state, REGION_LIMIT),
    }
}

/// Canonicalize a country value; empty means US.
pub fn normalize_country(country: &str) -> String {
    let upper = country.trim().to_uppercase();
    if upper.is_empty() || is_us_country(&upper) {
        return "US".to_string();
    }
    truncate_chars(&upper, REGION_LIMIT)
}
