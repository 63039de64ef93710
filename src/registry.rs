use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;

use crate::domain::{Condition, RawStudyRecord, StudyField};
use crate::error::TrialsError;

pub const DEFAULT_ENDPOINT: &str = "https://clinicaltrials.gov/api/query/study_fields";
pub const DEFAULT_MAX_RESULTS: u32 = 100;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub trait RegistryClient: Send + Sync {
    /// Studies matching `condition`, ranks `1..=max_results`.
    fn fetch_studies(
        &self,
        condition: &Condition,
        max_results: u32,
    ) -> Result<Vec<RawStudyRecord>, TrialsError>;
}

impl<T: RegistryClient + ?Sized> RegistryClient for &T {
    fn fetch_studies(
        &self,
        condition: &Condition,
        max_results: u32,
    ) -> Result<Vec<RawStudyRecord>, TrialsError> {
        (**self).fetch_studies(condition, max_results)
    }
}

/// What a single condition's fetch produced. A failure still lets the run go
/// on with zero studies for that condition.
#[derive(Debug)]
pub enum FetchOutcome {
    Fetched(Vec<RawStudyRecord>),
    Failed { reason: String },
}

impl FetchOutcome {
    pub fn from_result(result: Result<Vec<RawStudyRecord>, TrialsError>) -> Self {
        match result {
            Ok(records) => FetchOutcome::Fetched(records),
            Err(err) => FetchOutcome::Failed {
                reason: err.to_string(),
            },
        }
    }

    pub fn records(&self) -> &[RawStudyRecord] {
        match self {
            FetchOutcome::Fetched(records) => records,
            FetchOutcome::Failed { .. } => &[],
        }
    }

    pub fn failure(&self) -> Option<&str> {
        match self {
            FetchOutcome::Fetched(_) => None,
            FetchOutcome::Failed { reason } => Some(reason),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FetchOutcome::Failed { .. })
    }
}

#[derive(Clone)]
pub struct RegistryHttpClient {
    client: Client,
    endpoint: String,
}

impl RegistryHttpClient {
    pub fn with_endpoint(endpoint: &str, timeout: Duration) -> Result<Self, TrialsError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("kira-trials/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| TrialsError::RegistryHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| TrialsError::RegistryHttp(err.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn query_params(condition: &Condition, max_results: u32) -> Vec<(&'static str, String)> {
        vec![
            ("expr", condition.query().to_string()),
            ("fields", StudyField::query_list()),
            ("min_rnk", "1".to_string()),
            ("max_rnk", max_results.to_string()),
            ("fmt", "json".to_string()),
        ]
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, TrialsError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "registry request failed".to_string());
        Err(TrialsError::RegistryStatus { status, message })
    }
}

impl RegistryClient for RegistryHttpClient {
    fn fetch_studies(
        &self,
        condition: &Condition,
        max_results: u32,
    ) -> Result<Vec<RawStudyRecord>, TrialsError> {
        let params = Self::query_params(condition, max_results);
        let response = self
            .client
            .get(&self.endpoint)
            .query(&params)
            .send()
            .map_err(|err| TrialsError::RegistryHttp(err.to_string()))?;
        let response = Self::handle_status(response)?;
        let raw_json: Value = response
            .json()
            .map_err(|err| TrialsError::RegistryResponse(err.to_string()))?;
        parse_study_fields(&raw_json)
    }
}

/// Pulls the per-study field lists out of a study-fields response.
///
/// A response without `StudyFieldsResponse` is malformed. One without
/// `StudyFields` simply found nothing.
pub fn parse_study_fields(raw: &Value) -> Result<Vec<RawStudyRecord>, TrialsError> {
    let body = raw
        .get("StudyFieldsResponse")
        .and_then(|value| value.as_object())
        .ok_or_else(|| {
            TrialsError::RegistryResponse("missing StudyFieldsResponse".to_string())
        })?;

    let Some(studies) = body.get("StudyFields") else {
        return Ok(Vec::new());
    };
    let studies = studies
        .as_array()
        .ok_or_else(|| TrialsError::RegistryResponse("StudyFields is not a list".to_string()))?;

    Ok(studies
        .iter()
        .filter_map(|study| study.as_object())
        .map(|study| {
            let mut record = RawStudyRecord::new();
            for (key, value) in study {
                if let Some(field) = StudyField::from_key(key) {
                    record.insert(field, field_values(value));
                }
            }
            record
        })
        .collect())
}

fn field_values(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(scalar_text).collect(),
        other => scalar_text(other).into_iter().collect(),
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}
