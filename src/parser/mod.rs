pub mod extract;
pub mod fields;
pub mod filter;
pub mod sections;
pub mod text;

use crate::record::TrialRecord;

/// Parse one page and keep it only if it has an identifier and is open for enrollment.
pub fn process_page(markdown: &str, source_url: &str) -> Option<TrialRecord> {
    let record = parse_page(markdown, source_url)?;
    filter::is_recruiting(&record).then_some(record)
}

/// Parse one page; `None` when it carries no registry identifier.
pub fn parse_page(markdown: &str, source_url: &str) -> Option<TrialRecord> {
    let record = extract::build_record(markdown, source_url);
    (!record.nct_id.is_empty()).then_some(record)
}
