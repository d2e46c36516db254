pub mod eligibility;
pub mod locations;

use std::sync::LazyLock;

use regex::Regex;

use super::fields::find_first_field;
use super::sections::{find_first_section, first_heading};
use super::text::normalize;
use crate::record::TrialRecord;

static NCT_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"NCT\d{8}").unwrap());

/// First registry identifier anywhere in the text.
pub fn find_nct_id(markdown: &str) -> Option<&str> {
    NCT_ID_RE.find(markdown).map(|m| m.as_str())
}

/// Build a complete record from one page. Absent sections and labels become
/// empty values; this never fails.
pub fn build_record(markdown: &str, source_url: &str) -> TrialRecord {
    let eligibility = eligibility::extract(markdown);

    TrialRecord {
        nct_id: find_nct_id(markdown).unwrap_or_default().to_string(),
        title: first_heading(markdown).unwrap_or_default().to_string(),
        condition: section_text(markdown, &["Conditions", "Condition"]),
        recruitment_status: normalize(&find_first_field(
            markdown,
            &["Recruitment Status", "Overall Status"],
        )),
        inclusion_criteria: eligibility.inclusion_criteria,
        exclusion_criteria: eligibility.exclusion_criteria,
        age_requirements: eligibility.age_requirements,
        sex: eligibility.sex,
        locations: locations::extract(markdown),
        sponsor: normalize(&find_first_field(markdown, &["Sponsor", "Lead Sponsor"])),
        contact_info: section_text(markdown, &["Contacts and Locations", "Contacts"]),
        source_url: source_url.to_string(),
    }
}

fn section_text(markdown: &str, names: &[&str]) -> String {
    find_first_section(markdown, names)
        .map(|s| normalize(&s))
        .unwrap_or_default()
}
