use std::collections::BTreeMap;
use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Delimiter used whenever a multi-valued registry field is flattened.
pub const VALUE_DELIMITER: &str = "; ";

pub const EXPORT_FILE_NAME: &str = "HSP_PLS_Clinical_Trials.xlsx";
pub const XLSX_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Overall status values the registry reports.
pub const STATUS_OPTIONS: &[&str] = &[
    "Not yet recruiting",
    "Recruiting",
    "Enrolling by invitation",
    "Active, not recruiting",
    "Completed",
    "Terminated",
    "Withdrawn",
    "Suspended",
    "Unknown status",
];

pub const DEFAULT_STATUSES: &[&str] = &["Recruiting", "Active, not recruiting"];

/// A disease query term together with the sheet its trials land in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Condition {
    query: String,
    sheet_name: String,
}

impl Condition {
    pub fn new(query: impl Into<String>, sheet_name: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            sheet_name: sheet_name.into(),
        }
    }

    pub fn hsp() -> Self {
        Self::new("Hereditary Spastic Paraplegia", "HSP Trials")
    }

    pub fn pls() -> Self {
        Self::new("Primary Lateral Sclerosis", "PLS Trials")
    }

    pub fn defaults() -> Vec<Self> {
        vec![Self::hsp(), Self::pls()]
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.query)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StudyField {
    BriefTitle,
    EnrollmentCount,
    InterventionName,
    StudyType,
    StartDate,
    PrimaryCompletionDate,
    SponsorName,
    LeadSponsorName,
    CollaboratorName,
    Phase,
    OverallStatus,
    PrincipalInvestigator,
}

impl StudyField {
    pub const ALL: [StudyField; 12] = [
        StudyField::BriefTitle,
        StudyField::EnrollmentCount,
        StudyField::InterventionName,
        StudyField::StudyType,
        StudyField::StartDate,
        StudyField::PrimaryCompletionDate,
        StudyField::SponsorName,
        StudyField::LeadSponsorName,
        StudyField::CollaboratorName,
        StudyField::Phase,
        StudyField::OverallStatus,
        StudyField::PrincipalInvestigator,
    ];

    /// Field name as the registry spells it.
    pub fn as_str(self) -> &'static str {
        match self {
            StudyField::BriefTitle => "BriefTitle",
            StudyField::EnrollmentCount => "EnrollmentCount",
            StudyField::InterventionName => "InterventionName",
            StudyField::StudyType => "StudyType",
            StudyField::StartDate => "StartDate",
            StudyField::PrimaryCompletionDate => "PrimaryCompletionDate",
            StudyField::SponsorName => "SponsorName",
            StudyField::LeadSponsorName => "LeadSponsorName",
            StudyField::CollaboratorName => "CollaboratorName",
            StudyField::Phase => "Phase",
            StudyField::OverallStatus => "OverallStatus",
            StudyField::PrincipalInvestigator => "PrincipalInvestigator",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.as_str() == key)
    }

    pub fn query_list() -> String {
        Self::ALL
            .iter()
            .map(|field| field.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for StudyField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One study as returned by the registry. Every field holds a list of values,
/// even when the registry only ever reports one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawStudyRecord {
    fields: BTreeMap<StudyField, Vec<String>>,
}

impl RawStudyRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<I, S>(mut self, field: StudyField, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(field, values.into_iter().map(Into::into).collect());
        self
    }

    pub fn insert(&mut self, field: StudyField, values: Vec<String>) {
        self.fields.insert(field, values);
    }

    pub fn values(&self, field: StudyField) -> &[String] {
        self.fields.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Values of `field` joined with `"; "`; empty when the field is absent.
    pub fn joined(&self, field: StudyField) -> String {
        self.values(field).join(VALUE_DELIMITER)
    }

    /// The sponsor of record: `SponsorName`, or `LeadSponsorName` when the
    /// registry leaves the former out. Collaborators never count.
    pub fn sponsor_of_record(&self) -> &[String] {
        match self.values(StudyField::SponsorName) {
            [] => self.values(StudyField::LeadSponsorName),
            sponsors => sponsors,
        }
    }

    pub fn sponsor_text(&self) -> String {
        self.sponsor_of_record().join(VALUE_DELIMITER)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayColumn {
    TrialName,
    Participants,
    Drug,
    StudyType,
    TimeFrameStart,
    TimeFrameEnd,
    Sponsor,
    Investigator,
    Notes,
    Phase,
    Status,
    GenePathway,
}

impl DisplayColumn {
    pub const ALL: [DisplayColumn; 12] = [
        DisplayColumn::TrialName,
        DisplayColumn::Participants,
        DisplayColumn::Drug,
        DisplayColumn::StudyType,
        DisplayColumn::TimeFrameStart,
        DisplayColumn::TimeFrameEnd,
        DisplayColumn::Sponsor,
        DisplayColumn::Investigator,
        DisplayColumn::Notes,
        DisplayColumn::Phase,
        DisplayColumn::Status,
        DisplayColumn::GenePathway,
    ];

    pub fn header(self) -> &'static str {
        match self {
            DisplayColumn::TrialName => "Trial Name",
            DisplayColumn::Participants => "Participants",
            DisplayColumn::Drug => "Drug",
            DisplayColumn::StudyType => "Type(Obs/Int)",
            DisplayColumn::TimeFrameStart => "TimeFrame Start",
            DisplayColumn::TimeFrameEnd => "TimeFrame End",
            DisplayColumn::Sponsor => "Sponsor",
            DisplayColumn::Investigator => "Investigator",
            DisplayColumn::Notes => "Notes",
            DisplayColumn::Phase => "Phase",
            DisplayColumn::Status => "Status",
            DisplayColumn::GenePathway => "Gene/Pathway",
        }
    }

    /// Zero-based position in the sheet.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn headers() -> Vec<&'static str> {
        Self::ALL.iter().map(|column| column.header()).collect()
    }
}

/// A flattened study, one string per display column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormattedRow {
    #[serde(rename = "Trial Name")]
    pub trial_name: String,
    #[serde(rename = "Participants")]
    pub participants: String,
    #[serde(rename = "Drug")]
    pub drug: String,
    #[serde(rename = "Type(Obs/Int)")]
    pub study_type: String,
    #[serde(rename = "TimeFrame Start")]
    pub start: String,
    #[serde(rename = "TimeFrame End")]
    pub end: String,
    #[serde(rename = "Sponsor")]
    pub sponsor: String,
    #[serde(rename = "Investigator")]
    pub investigator: String,
    #[serde(rename = "Notes")]
    pub notes: String,
    #[serde(rename = "Phase")]
    pub phase: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Gene/Pathway")]
    pub gene: String,
}

impl FormattedRow {
    pub fn get(&self, column: DisplayColumn) -> &str {
        match column {
            DisplayColumn::TrialName => &self.trial_name,
            DisplayColumn::Participants => &self.participants,
            DisplayColumn::Drug => &self.drug,
            DisplayColumn::StudyType => &self.study_type,
            DisplayColumn::TimeFrameStart => &self.start,
            DisplayColumn::TimeFrameEnd => &self.end,
            DisplayColumn::Sponsor => &self.sponsor,
            DisplayColumn::Investigator => &self.investigator,
            DisplayColumn::Notes => &self.notes,
            DisplayColumn::Phase => &self.phase,
            DisplayColumn::Status => &self.status,
            DisplayColumn::GenePathway => &self.gene,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StatusMatch {
    /// Joined status must equal one of the selected statuses.
    #[default]
    Exact,
    /// A selected status must appear somewhere in the joined status.
    Substring,
}

impl fmt::Display for StatusMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusMatch::Exact => write!(f, "exact"),
            StatusMatch::Substring => write!(f, "substring"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum GeneMatch {
    #[default]
    All,
    First,
}

impl fmt::Display for GeneMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeneMatch::All => write!(f, "all"),
            GeneMatch::First => write!(f, "first"),
        }
    }
}
