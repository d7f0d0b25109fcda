//! Region derivation from free-form addresses.
//!
//! An explicit `XX 12345` code wins; otherwise the last full state name found in
//! the address is mapped to its code; otherwise the record lands in
//! [`UNKNOWN_REGION`].

use std::sync::LazyLock;

use regex::Regex;

use crate::UNKNOWN_REGION;

/// 50 states plus the federal district.
pub const REGION_NAMES: [(&str, &str); 51] = [
    ("Alabama", "AL"),
    ("Alaska", "AK"),
    ("Arizona", "AZ"),
    ("Arkansas", "AR"),
    ("California", "CA"),
    ("Colorado", "CO"),
    ("Connecticut", "CT"),
    ("Delaware", "DE"),
    ("District of Columbia", "DC"),
    ("Florida", "FL"),
    ("Georgia", "GA"),
    ("Hawaii", "HI"),
    ("Idaho", "ID"),
    ("Illinois", "IL"),
    ("Indiana", "IN"),
    ("Iowa", "IA"),
    ("Kansas", "KS"),
    ("Kentucky", "KY"),
    ("Louisiana", "LA"),
    ("Maine", "ME"),
    ("Maryland", "MD"),
    ("Massachusetts", "MA"),
    ("Michigan", "MI"),
    ("Minnesota", "MN"),
    ("Mississippi", "MS"),
    ("Missouri", "MO"),
    ("Montana", "MT"),
    ("Nebraska", "NE"),
    ("Nevada", "NV"),
    ("New Hampshire", "NH"),
    ("New Jersey", "NJ"),
    ("New Mexico", "NM"),
    ("New York", "NY"),
    ("North Carolina", "NC"),
    ("North Dakota", "ND"),
    ("Ohio", "OH"),
    ("Oklahoma", "OK"),
    ("Oregon", "OR"),
    ("Pennsylvania", "PA"),
    ("Rhode Island", "RI"),
    ("South Carolina", "SC"),
    ("South Dakota", "SD"),
    ("Tennessee", "TN"),
    ("Texas", "TX"),
    ("Utah", "UT"),
    ("Vermont", "VT"),
    ("Virginia", "VA"),
    ("Washington", "WA"),
    ("West Virginia", "WV"),
    ("Wisconsin", "WI"),
    ("Wyoming", "WY"),
];

static POSTAL_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Z]{2})\s+\d{5}(?:-\d{4})?\b").expect("postal code regex is valid")
});

// Longest names first so `West Virginia` is tried before `Virginia` at the same offset.
static REGION_NAME: LazyLock<Regex> = LazyLock::new(|| {
    let mut names: Vec<&str> = REGION_NAMES.iter().map(|(name, _)| *name).collect();
    names.sort_by_key(|name| std::cmp::Reverse(name.len()));
    let alternation = names
        .iter()
        .map(|name| regex::escape(name))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).expect("region name regex is valid")
});

/// Derives the region code of an address.
pub fn derive_region(address: &str) -> String {
    if let Some(caps) = POSTAL_CODE.captures(address) {
        return caps[1].to_string();
    }

    let last_name = REGION_NAME
        .find_iter(address)
        .max_by_key(|m| (m.end(), m.len()));
    if let Some(m) = last_name {
        if let Some(code) = code_for_name(m.as_str()) {
            return code.to_string();
        }
    }

    UNKNOWN_REGION.to_string()
}

/// Looks up the code of a full region name, ignoring case.
pub fn code_for_name(name: &str) -> Option<&'static str> {
    REGION_NAMES
        .iter()
        .find(|(full, _)| full.eq_ignore_ascii_case(name))
        .map(|(_, code)| *code)
}
