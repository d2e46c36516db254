use serde::Serialize;

/// One study page, fully populated. Missing data is an empty string or empty vec.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrialRecord {
    pub nct_id: String,
    pub title: String,
    pub condition: String,
    pub recruitment_status: String,
    pub inclusion_criteria: String,
    pub exclusion_criteria: String,
    pub age_requirements: String,
    pub sex: String,
    pub locations: Vec<Location>,
    pub sponsor: String,
    pub contact_info: String,
    pub source_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Location {
    pub city: String,
    pub state: String,
    pub country: String,
}

/// Eligibility sub-fields, all optional in the source text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Eligibility {
    pub inclusion_criteria: String,
    pub exclusion_criteria: String,
    pub age_requirements: String,
    pub sex: String,
}
