use crate::domain::{FormattedRow, GeneMatch, RawStudyRecord, StudyField};
use crate::genes::{self, GeneVocabulary};

/// Flattens one record into its display row. Notes is left blank for manual
/// annotation downstream.
pub fn format_record(
    record: &RawStudyRecord,
    vocabulary: &GeneVocabulary,
    policy: GeneMatch,
) -> FormattedRow {
    let trial_name = record.joined(StudyField::BriefTitle);
    let drug = record.joined(StudyField::InterventionName);
    let gene = genes::tag(&genes::tagging_text(&trial_name, &drug), vocabulary, policy);

    FormattedRow {
        participants: record.joined(StudyField::EnrollmentCount),
        study_type: record.joined(StudyField::StudyType),
        start: record.joined(StudyField::StartDate),
        end: record.joined(StudyField::PrimaryCompletionDate),
        sponsor: record.sponsor_text(),
        investigator: record.joined(StudyField::PrincipalInvestigator),
        notes: String::new(),
        phase: record.joined(StudyField::Phase),
        status: record.joined(StudyField::OverallStatus),
        trial_name,
        drug,
        gene,
    }
}

pub fn format_records(
    records: &[RawStudyRecord],
    vocabulary: &GeneVocabulary,
    policy: GeneMatch,
) -> Vec<FormattedRow> {
    records
        .iter()
        .map(|record| format_record(record, vocabulary, policy))
        .collect()
}
