use std::sync::LazyLock;

use regex::Regex;

use crate::parser::sections::find_first_section;
use crate::parser::text::{is_bare_bullet, strip_bullet};
use crate::record::Location;

const SECTIONS: &[&str] = &["Locations", "Contacts and Locations"];

// Contact metadata under a site, not a site itself.
static CONTACT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:contacts?|phones?|emails?|sites?)\b").unwrap());

pub fn extract(markdown: &str) -> Vec<Location> {
    let Some(section) = find_first_section(markdown, SECTIONS) else {
        return Vec::new();
    };

    section
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !is_bare_bullet(l))
        .map(strip_bullet)
        .filter(|l| !is_contact_line(l))
        .filter_map(parse_location)
        .collect()
}

fn is_contact_line(line: &str) -> bool {
    CONTACT_RE.is_match(line)
}

/// Split `City, State, Country` by comma count. A single part is taken as the
/// country and two parts as city/state, so locations without a state come out
/// shifted. Empty parts still count.
pub fn parse_location(line: &str) -> Option<Location> {
    if line.trim().is_empty() {
        return None;
    }
    let parts: Vec<&str> = line.split(',').map(str::trim).collect();

    match parts.as_slice() {
        [] => None,
        [country] => Some(Location {
            country: country.to_string(),
            ..Default::default()
        }),
        [city, state] => Some(Location {
            city: city.to_string(),
            state: state.to_string(),
            ..Default::default()
        }),
        [city, state, rest @ ..] => Some(Location {
            city: city.to_string(),
            state: state.to_string(),
            country: rest.join(", "),
        }),
    }
}
