use crate::record::TrialRecord;

const OPEN_STATUSES: &[&str] = &["recruiting", "not yet recruiting"];

/// Whether a status string means the trial is open for enrollment.
pub fn is_open_status(status: &str) -> bool {
    let status = status.trim();
    OPEN_STATUSES.iter().any(|s| status.eq_ignore_ascii_case(s))
}

pub fn is_recruiting(record: &TrialRecord) -> bool {
    is_open_status(&record.recruitment_status)
}
