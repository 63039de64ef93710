use std::time::{Duration, Instant};

use serde::Serialize;

use crate::config::RunConfig;
use crate::domain::{Condition, DisplayColumn, EXPORT_FILE_NAME, FormattedRow, XLSX_MIME_TYPE};
use crate::error::TrialsError;
use crate::export::{self, SheetRows, WorkbookSummary};
use crate::filter;
use crate::format;
use crate::registry::{FetchOutcome, RegistryClient};

#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub file_name: String,
    pub mime_type: String,
    pub generated_at: String,
    pub size_bytes: usize,
    pub sheets: Vec<SheetReport>,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl RunResult {
    pub fn failed_sheets(&self) -> impl Iterator<Item = &SheetReport> {
        self.sheets.iter().filter(|sheet| sheet.error.is_some())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SheetReport {
    pub condition: String,
    pub sheet_name: String,
    pub fetched: usize,
    pub kept: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub enum Phase {
    Resolve,
    Fetch,
    Filter,
    Format,
    Export,
    Verify,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Phase::Resolve => "Resolve",
            Phase::Fetch => "Fetch",
            Phase::Filter => "Filter",
            Phase::Format => "Format",
            Phase::Export => "Export",
            Phase::Verify => "Verify",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

impl ProgressEvent {
    fn phase(phase: Phase, message: impl AsRef<str>) -> Self {
        Self {
            message: format!("phase={}; {}", phase.label(), message.as_ref()),
            elapsed: None,
        }
    }

    fn timed(phase: Phase, message: impl AsRef<str>, elapsed: Duration) -> Self {
        Self {
            elapsed: Some(elapsed),
            ..Self::phase(phase, message)
        }
    }
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

/// Runs the extraction pipeline against a registry.
#[derive(Clone)]
pub struct App<R: RegistryClient> {
    registry: R,
}

impl<R: RegistryClient> App<R> {
    pub fn new(registry: R) -> Self {
        Self { registry }
    }

    /// Fetches, filters and formats every condition in turn, then builds the
    /// workbook. A failed fetch leaves that condition's sheet empty and is
    /// reported in the result rather than returned as an error.
    pub fn run(
        &self,
        config: &RunConfig,
        sink: &dyn ProgressSink,
    ) -> Result<RunResult, TrialsError> {
        sink.event(ProgressEvent::phase(
            Phase::Resolve,
            format!(
                "{} conditions, {} genes, max_results={}",
                config.conditions.len(),
                config.vocabulary.len(),
                config.max_results
            ),
        ));

        let mut sheets = Vec::with_capacity(config.conditions.len());
        let mut reports = Vec::with_capacity(config.conditions.len());
        for condition in &config.conditions {
            let (rows, report) = self.run_condition(condition, config, sink);
            sheets.push(SheetRows::new(condition.sheet_name(), rows));
            reports.push(report);
        }

        sink.event(ProgressEvent::phase(Phase::Export, "writing workbook"));
        let bytes = export::export_workbook(&sheets)?;

        sink.event(ProgressEvent::phase(Phase::Verify, "reading workbook back"));
        let summary = export::inspect_workbook(&bytes)?;
        verify_workbook(&summary, &sheets)?;

        tracing::info!(size = bytes.len(), sheets = sheets.len(), "workbook ready");

        Ok(RunResult {
            file_name: EXPORT_FILE_NAME.to_string(),
            mime_type: XLSX_MIME_TYPE.to_string(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            size_bytes: bytes.len(),
            sheets: reports,
            bytes,
        })
    }

    fn run_condition(
        &self,
        condition: &Condition,
        config: &RunConfig,
        sink: &dyn ProgressSink,
    ) -> (Vec<FormattedRow>, SheetReport) {
        sink.event(ProgressEvent::phase(
            Phase::Fetch,
            format!("registry.request {condition}"),
        ));
        let start = Instant::now();
        let outcome = self.fetch(condition, config.max_results);
        sink.event(ProgressEvent::timed(
            Phase::Fetch,
            format!("registry.response studies={}", outcome.records().len()),
            start.elapsed(),
        ));

        let kept = filter::filter_records(outcome.records(), &config.criteria);
        sink.event(ProgressEvent::phase(
            Phase::Filter,
            format!("{} of {} studies kept", kept.len(), outcome.records().len()),
        ));

        let rows = format::format_records(&kept, &config.vocabulary, config.gene_match);
        sink.event(ProgressEvent::phase(
            Phase::Format,
            format!("{} rows for {}", rows.len(), condition.sheet_name()),
        ));

        let report = SheetReport {
            condition: condition.query().to_string(),
            sheet_name: condition.sheet_name().to_string(),
            fetched: outcome.records().len(),
            kept: rows.len(),
            error: outcome.failure().map(str::to_string),
        };
        (rows, report)
    }

    fn fetch(&self, condition: &Condition, max_results: u32) -> FetchOutcome {
        let outcome =
            FetchOutcome::from_result(self.registry.fetch_studies(condition, max_results));
        match &outcome {
            FetchOutcome::Fetched(records) => {
                tracing::debug!(condition = %condition, studies = records.len(), "fetched");
            }
            FetchOutcome::Failed { reason } => {
                tracing::warn!(
                    condition = %condition,
                    %reason,
                    "fetch failed, continuing with no studies"
                );
            }
        }
        outcome
    }
}

fn verify_workbook(summary: &WorkbookSummary, sheets: &[SheetRows]) -> Result<(), TrialsError> {
    let expected: Vec<&str> = sheets.iter().map(|sheet| sheet.name.as_str()).collect();
    if summary.sheet_names() != expected {
        return Err(TrialsError::Export(format!(
            "workbook sheets {:?} do not match {:?}",
            summary.sheet_names(),
            expected
        )));
    }
    let headers = DisplayColumn::headers();
    for (sheet, written) in summary.sheets.iter().zip(sheets) {
        if sheet.header != headers {
            return Err(TrialsError::Export(format!(
                "sheet {} has an unexpected header row",
                sheet.name
            )));
        }
        if sheet.data_rows() != written.rows.len() {
            return Err(TrialsError::Export(format!(
                "sheet {} holds {} rows, expected {}",
                sheet.name,
                sheet.data_rows(),
                written.rows.len()
            )));
        }
    }
    Ok(())
}
