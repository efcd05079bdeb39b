// src/matcher.rs
use crate::feed::IncidentRecord;

/// Case-insensitive substring filter over `IncidentRecord::location`.
#[derive(Debug, Clone)]
pub struct LocationMatcher {
    needle: String,
}

impl LocationMatcher {
    pub fn new(term: &str) -> Self {
        Self {
            needle: term.to_uppercase(),
        }
    }

    pub fn term(&self) -> &str {
        &self.needle
    }

    pub fn matches(&self, record: &IncidentRecord) -> bool {
        record.location.to_uppercase().contains(&self.needle)
    }

    /// Keeps feed order; never errors, an empty input or no hit gives an empty vec.
    pub fn filter<'a>(&self, records: &'a [IncidentRecord]) -> Vec<&'a IncidentRecord> {
        let hits: Vec<&IncidentRecord> = records.iter().filter(|r| self.matches(r)).collect();
        for r in &hits {
            tracing::debug!(incident = %r.incident_id, location = %r.location, "location match");
        }
        hits
    }
}

/// Free-function form for one-off filtering.
pub fn filter_by_location<'a>(records: &'a [IncidentRecord], term: &str) -> Vec<&'a IncidentRecord> {
    LocationMatcher::new(term).filter(records)
}
