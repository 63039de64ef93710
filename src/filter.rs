use std::collections::BTreeSet;

use serde::Serialize;

use crate::domain::{RawStudyRecord, StatusMatch, StudyField};

/// Sponsor-name fragments treated as a sign of a company sponsor. This is a
/// heuristic: sponsors that match none of these are classed as non-industry.
pub const INDUSTRY_MARKERS: &[&str] = &[
    "inc",
    "ltd",
    "pharma",
    "gmbh",
    "corp",
    "llc",
    "plc",
    "s.a.",
    "biosciences",
];

/// Filter selections for one run. Unset predicates do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterCriteria {
    pub statuses: Option<BTreeSet<String>>,
    pub status_match: StatusMatch,
    pub phase: Option<String>,
    pub industry_only: bool,
}

impl FilterCriteria {
    pub fn with_statuses<I, S>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.statuses = Some(statuses.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_status_match(mut self, status_match: StatusMatch) -> Self {
        self.status_match = status_match;
        self
    }

    pub fn with_phase(mut self, phase: impl Into<String>) -> Self {
        self.phase = Some(phase.into());
        self
    }

    pub fn industry_only(mut self, industry_only: bool) -> Self {
        self.industry_only = industry_only;
        self
    }

    pub fn matches(&self, record: &RawStudyRecord) -> bool {
        self.status_passes(record) && self.phase_passes(record) && self.sponsor_passes(record)
    }

    fn status_passes(&self, record: &RawStudyRecord) -> bool {
        let Some(allowed) = &self.statuses else {
            return true;
        };
        let status = record.joined(StudyField::OverallStatus).to_lowercase();
        let mut allowed = allowed.iter().map(|value| value.to_lowercase());
        match self.status_match {
            StatusMatch::Exact => allowed.any(|value| value == status),
            StatusMatch::Substring => allowed.any(|value| status.contains(value.as_str())),
        }
    }

    fn phase_passes(&self, record: &RawStudyRecord) -> bool {
        let Some(phase) = &self.phase else {
            return true;
        };
        record
            .joined(StudyField::Phase)
            .to_lowercase()
            .contains(phase.to_lowercase().as_str())
    }

    fn sponsor_passes(&self, record: &RawStudyRecord) -> bool {
        !self.industry_only || is_industry_sponsor(&record.sponsor_text())
    }
}

pub fn is_industry_sponsor(sponsor: &str) -> bool {
    let sponsor = sponsor.to_lowercase();
    INDUSTRY_MARKERS.iter().any(|marker| sponsor.contains(*marker))
}

/// Records that pass every active predicate, in their original order.
pub fn filter_records(
    records: &[RawStudyRecord],
    criteria: &FilterCriteria,
) -> Vec<RawStudyRecord> {
    records
        .iter()
        .filter(|record| criteria.matches(record))
        .cloned()
        .collect()
}
