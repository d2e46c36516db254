use std::sync::LazyLock;

use regex::Regex;

use crate::parser::fields::{find_field, find_first_field};
use crate::parser::sections::find_section;
use crate::parser::text::normalize;
use crate::record::Eligibility;

const SECTION: &str = "Eligibility Criteria";

static INCLUSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)inclusion criteria(?:\*\*|__)?[ \t]*:(?:\*\*|__)?").unwrap());
static EXCLUSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)exclusion criteria(?:\*\*|__)?[ \t]*:(?:\*\*|__)?").unwrap());

// Scalar labels that close a criteria list when they start a line.
static SCALAR_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?im)^[ \t]*(?:\*\*|__)?(?:sex|gender|minimum age|maximum age|ages eligible for study|accepts healthy volunteers)(?:\*\*|__)?[ \t]*[:\-]",
    )
    .unwrap()
});
static INCLUSION_STOP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:\*\*|__)?exclusion criteria").unwrap());
static EXCLUSION_STOP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:\*\*|__)?inclusion criteria").unwrap());

pub fn extract(markdown: &str) -> Eligibility {
    let Some(section) = find_section(markdown, SECTION) else {
        return Eligibility::default();
    };

    let inclusion = criteria_block(&section, &INCLUSION_RE, &INCLUSION_STOP_RE);
    let exclusion = criteria_block(&section, &EXCLUSION_RE, &EXCLUSION_STOP_RE);
    let sex = find_first_field(&section, &["Sex", "Gender"]);

    Eligibility {
        inclusion_criteria: normalize(inclusion),
        exclusion_criteria: normalize(exclusion),
        age_requirements: age_requirements(&section),
        sex: normalize(&sex),
    }
}

/// Text after `start`, up to the opposite criteria label, a scalar label line,
/// or the end of the section.
fn criteria_block<'a>(section: &'a str, start: &Regex, stop: &Regex) -> &'a str {
    let Some(m) = start.find(section) else {
        return "";
    };
    let rest = &section[m.end()..];
    let end = [stop.find(rest), SCALAR_LABEL_RE.find(rest)]
        .into_iter()
        .flatten()
        .map(|m| m.start())
        .min()
        .unwrap_or(rest.len());
    rest[..end].trim()
}

fn age_requirements(section: &str) -> String {
    let parts: Vec<String> = ["Minimum Age", "Maximum Age"]
        .into_iter()
        .filter_map(|label| {
            find_field(section, label)
                .filter(|v| !v.is_empty())
                .map(|v| format!("{}: {}", label, v))
        })
        .collect();
    normalize(&parts.join("\n"))
}
