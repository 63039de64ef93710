use std::collections::HashMap;
use std::sync::Mutex;

use kira_trials::app::{App, ProgressEvent, ProgressSink};
use kira_trials::config::RunConfig;
use kira_trials::domain::{
    Condition, DisplayColumn, EXPORT_FILE_NAME, RawStudyRecord, StudyField, XLSX_MIME_TYPE,
};
use kira_trials::error::TrialsError;
use kira_trials::export::inspect_workbook;
use kira_trials::filter::FilterCriteria;
use kira_trials::registry::RegistryClient;

struct NoopSink;

impl ProgressSink for NoopSink {
    fn event(&self, _event: ProgressEvent) {}
}

#[derive(Default)]
struct RecordingSink {
    messages: Mutex<Vec<String>>,
}

impl ProgressSink for RecordingSink {
    fn event(&self, event: ProgressEvent) {
        self.messages.lock().unwrap().push(event.message);
    }
}

/// Serves canned studies per condition query; queries listed in `failing`
/// behave like an unreachable registry.
#[derive(Default)]
struct MockRegistry {
    studies: HashMap<String, Vec<RawStudyRecord>>,
    failing: Vec<String>,
    calls: Mutex<Vec<(String, u32)>>,
}

impl MockRegistry {
    fn with_studies(mut self, query: &str, studies: Vec<RawStudyRecord>) -> Self {
        self.studies.insert(query.to_string(), studies);
        self
    }

    fn failing(mut self, query: &str) -> Self {
        self.failing.push(query.to_string());
        self
    }
}

impl RegistryClient for MockRegistry {
    fn fetch_studies(
        &self,
        condition: &Condition,
        max_results: u32,
    ) -> Result<Vec<RawStudyRecord>, TrialsError> {
        self.calls
            .lock()
            .unwrap()
            .push((condition.query().to_string(), max_results));
        if self.failing.iter().any(|query| query == condition.query()) {
            return Err(TrialsError::RegistryHttp("connection refused".to_string()));
        }
        Ok(self
            .studies
            .get(condition.query())
            .cloned()
            .unwrap_or_default())
    }
}

fn study(title: &str, intervention: &str, status: &str) -> RawStudyRecord {
    RawStudyRecord::new()
        .with(StudyField::BriefTitle, [title])
        .with(StudyField::InterventionName, [intervention])
        .with(StudyField::OverallStatus, [status])
}

fn recruiting_only() -> RunConfig {
    RunConfig {
        criteria: FilterCriteria::default().with_statuses(["Recruiting"]),
        ..RunConfig::default()
    }
}

#[test]
fn recruiting_study_is_tagged_and_exported() {
    let hsp = Condition::hsp();
    let registry = MockRegistry::default().with_studies(
        hsp.query(),
        vec![study("SPAST trial for HSP", "Gene therapy", "Recruiting")],
    );
    let app = App::new(registry);

    let result = app.run(&recruiting_only(), &NoopSink).unwrap();

    assert_eq!(result.file_name, EXPORT_FILE_NAME);
    assert_eq!(result.mime_type, XLSX_MIME_TYPE);
    assert_eq!(result.size_bytes, result.bytes.len());
    assert_eq!(result.sheets[0].sheet_name, "HSP Trials");
    assert_eq!(result.sheets[0].fetched, 1);
    assert_eq!(result.sheets[0].kept, 1);

    let summary = inspect_workbook(&result.bytes).unwrap();
    let hsp_sheet = summary.sheet("HSP Trials").unwrap();
    assert_eq!(hsp_sheet.data_rows(), 1);
    assert_eq!(
        hsp_sheet.cell(0, DisplayColumn::TrialName),
        Some("SPAST trial for HSP")
    );
    assert_eq!(hsp_sheet.cell(0, DisplayColumn::Drug), Some("Gene therapy"));
    assert_eq!(hsp_sheet.cell(0, DisplayColumn::Status), Some("Recruiting"));
    assert_eq!(hsp_sheet.cell(0, DisplayColumn::GenePathway), Some("SPAST"));
    assert_eq!(summary.sheet("PLS Trials").unwrap().data_rows(), 0);
}

#[test]
fn withdrawn_study_is_excluded() {
    let hsp = Condition::hsp();
    let registry = MockRegistry::default().with_studies(
        hsp.query(),
        vec![study("SPAST trial for HSP", "Gene therapy", "Withdrawn")],
    );
    let app = App::new(registry);

    let result = app.run(&recruiting_only(), &NoopSink).unwrap();

    assert_eq!(result.sheets[0].fetched, 1);
    assert_eq!(result.sheets[0].kept, 0);
    let summary = inspect_workbook(&result.bytes).unwrap();
    assert_eq!(summary.sheet("HSP Trials").unwrap().data_rows(), 0);
}

#[test]
fn pipeline_rows_carry_gene_tag() {
    let record = study("SPAST trial for HSP", "Gene therapy", "Recruiting");
    let config = recruiting_only();
    let kept = kira_trials::filter::filter_records(&[record], &config.criteria);
    let rows =
        kira_trials::format::format_records(&kept, &config.vocabulary, config.gene_match);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get(DisplayColumn::GenePathway), "SPAST");
    assert_eq!(rows[0].get(DisplayColumn::Status), "Recruiting");
}

#[test]
fn failed_fetch_does_not_block_other_condition() {
    let hsp = Condition::hsp();
    let pls = Condition::pls();
    let registry = MockRegistry::default().failing(hsp.query()).with_studies(
        pls.query(),
        vec![
            study("PLS natural history", "", "Recruiting"),
            study("PLS3 observational cohort", "", "Recruiting"),
        ],
    );
    let app = App::new(registry);

    let result = app.run(&recruiting_only(), &NoopSink).unwrap();

    assert_eq!(result.failed_sheets().count(), 1);
    assert!(result.sheets[0].error.is_some());
    assert_eq!(result.sheets[0].kept, 0);
    assert!(result.sheets[1].error.is_none());
    assert_eq!(result.sheets[1].kept, 2);

    let summary = inspect_workbook(&result.bytes).unwrap();
    assert_eq!(summary.sheet_names(), ["HSP Trials", "PLS Trials"]);
    assert_eq!(summary.sheet("HSP Trials").unwrap().data_rows(), 0);
    assert_eq!(summary.sheet("PLS Trials").unwrap().data_rows(), 2);
}

#[test]
fn no_matches_still_exports_two_sheets() {
    let app = App::new(MockRegistry::default());
    let result = app.run(&RunConfig::default(), &NoopSink).unwrap();

    let summary = inspect_workbook(&result.bytes).unwrap();
    assert_eq!(summary.sheets.len(), 2);
    for sheet in &summary.sheets {
        assert!(sheet.rows.is_empty());
        assert_eq!(sheet.header, DisplayColumn::headers());
    }
}

#[test]
fn conditions_are_fetched_in_order_with_result_cap() {
    let registry = MockRegistry::default();
    let config = RunConfig {
        max_results: 25,
        ..RunConfig::default()
    };
    let app = App::new(&registry);
    let sink = RecordingSink::default();
    app.run(&config, &sink).unwrap();

    let calls = registry.calls.lock().unwrap();
    assert_eq!(
        *calls,
        [
            ("Hereditary Spastic Paraplegia".to_string(), 25),
            ("Primary Lateral Sclerosis".to_string(), 25),
        ]
    );

    let messages = sink.messages.lock().unwrap();
    assert!(messages.iter().any(|message| message.starts_with("phase=Export")));
    assert!(messages.iter().any(|message| message.starts_with("phase=Verify")));
    let fetches: Vec<&String> = messages
        .iter()
        .filter(|message| message.contains("registry.request"))
        .collect();
    assert_eq!(fetches.len(), 2);
    assert!(fetches[0].contains("Hereditary Spastic Paraplegia"));
    assert!(fetches[1].contains("Primary Lateral Sclerosis"));
}
