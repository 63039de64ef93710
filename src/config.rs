use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::domain::{
    Condition, DEFAULT_STATUSES, EXPORT_FILE_NAME, GeneMatch, STATUS_OPTIONS, StatusMatch,
};
use crate::error::TrialsError;
use crate::filter::FilterCriteria;
use crate::genes::GeneVocabulary;
use crate::registry::{DEFAULT_ENDPOINT, DEFAULT_MAX_RESULTS, DEFAULT_TIMEOUT_SECS};

pub const CONFIG_FILE_NAME: &str = "kira-trials.json";

/// Upper bound the study-fields endpoint accepts for `max_rnk`.
pub const MAX_RESULTS_LIMIT: u32 = 1000;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub statuses: Option<Vec<String>>,
    #[serde(default)]
    pub all_statuses: Option<bool>,
    #[serde(default)]
    pub status_match: Option<StatusMatch>,
    #[serde(default)]
    pub phase: Option<String>,
    #[serde(default)]
    pub industry_only: Option<bool>,
    #[serde(default)]
    pub genes: Option<Vec<String>>,
    #[serde(default)]
    pub gene_file: Option<String>,
    #[serde(default)]
    pub gene_match: Option<GeneMatch>,
    #[serde(default)]
    pub max_results: Option<u32>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub output: Option<String>,
}

/// Values given on the command line; each one set replaces the config file's.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub statuses: Vec<String>,
    pub all_statuses: bool,
    pub status_match: Option<StatusMatch>,
    pub phase: Option<String>,
    /// `Some(false)` turns off an `industry_only` set in the config file.
    pub industry_only: Option<bool>,
    pub gene_file: Option<String>,
    pub gene_match: Option<GeneMatch>,
    pub max_results: Option<u32>,
    pub output: Option<String>,
}

impl Config {
    pub fn apply(mut self, overrides: ConfigOverrides) -> Self {
        if !overrides.statuses.is_empty() {
            self.statuses = Some(overrides.statuses);
            self.all_statuses = Some(false);
        }
        if overrides.all_statuses {
            self.all_statuses = Some(true);
        }
        if overrides.status_match.is_some() {
            self.status_match = overrides.status_match;
        }
        if overrides.phase.is_some() {
            self.phase = overrides.phase;
        }
        if overrides.industry_only.is_some() {
            self.industry_only = overrides.industry_only;
        }
        if overrides.gene_file.is_some() {
            self.gene_file = overrides.gene_file;
        }
        if overrides.gene_match.is_some() {
            self.gene_match = overrides.gene_match;
        }
        if overrides.max_results.is_some() {
            self.max_results = overrides.max_results;
        }
        if overrides.output.is_some() {
            self.output = overrides.output;
        }
        self
    }
}

/// Everything one pipeline run needs, fixed before the first request.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub conditions: Vec<Condition>,
    pub criteria: FilterCriteria,
    pub vocabulary: GeneVocabulary,
    pub gene_match: GeneMatch,
    pub max_results: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            conditions: Condition::defaults(),
            criteria: FilterCriteria::default().with_statuses(DEFAULT_STATUSES.iter().copied()),
            vocabulary: GeneVocabulary::default(),
            gene_match: GeneMatch::default(),
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub run: RunConfig,
    pub endpoint: String,
    pub timeout: Duration,
    pub output: Utf8PathBuf,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads the config file (the given path, or `kira-trials.json` when it
    /// exists in the current directory), applies the overrides and resolves.
    pub fn resolve(
        path: Option<&str>,
        overrides: ConfigOverrides,
    ) -> Result<ResolvedConfig, TrialsError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(CONFIG_FILE_NAME),
        };

        let config = if path.is_none() && !config_path.exists() {
            Config::default()
        } else {
            Self::read(&config_path)?
        };

        Self::resolve_config(config.apply(overrides))
    }

    pub fn read(path: &Path) -> Result<Config, TrialsError> {
        let content =
            fs::read_to_string(path).map_err(|_| TrialsError::ConfigRead(path.to_path_buf()))?;
        serde_json::from_str(&content).map_err(|err| TrialsError::ConfigParse(err.to_string()))
    }

    /// Validates the config and loads the gene vocabulary. A gene file without
    /// a `Gene` column fails here, before anything is fetched.
    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, TrialsError> {
        let schema_version = config.schema_version.unwrap_or(1);

        let statuses = if config.all_statuses.unwrap_or(false) {
            None
        } else {
            let statuses = config
                .statuses
                .unwrap_or_else(|| DEFAULT_STATUSES.iter().map(|s| s.to_string()).collect());
            if statuses.is_empty() {
                return Err(TrialsError::InvalidConfig(
                    "statuses is empty (set all_statuses to disable status filtering)"
                        .to_string(),
                ));
            }
            for status in &statuses {
                if !STATUS_OPTIONS
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(status))
                {
                    tracing::warn!(status = %status, "status is not a known registry status");
                }
            }
            Some(statuses.into_iter().collect())
        };

        let phase = config
            .phase
            .map(|phase| phase.trim().to_string())
            .filter(|phase| !phase.is_empty());

        let criteria = FilterCriteria {
            statuses,
            status_match: config.status_match.unwrap_or_default(),
            phase,
            industry_only: config.industry_only.unwrap_or(false),
        };

        let vocabulary = match (&config.gene_file, &config.genes) {
            (Some(file), _) => GeneVocabulary::load(Path::new(file))?,
            (None, Some(genes)) => GeneVocabulary::from_symbols(genes),
            (None, None) => GeneVocabulary::default(),
        };

        let max_results = config.max_results.unwrap_or(DEFAULT_MAX_RESULTS);
        if max_results == 0 || max_results > MAX_RESULTS_LIMIT {
            return Err(TrialsError::InvalidConfig(format!(
                "max_results must be between 1 and {MAX_RESULTS_LIMIT}, got {max_results}"
            )));
        }

        let timeout_secs = config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(TrialsError::InvalidConfig(
                "timeout_secs must be positive".to_string(),
            ));
        }

        Ok(ResolvedConfig {
            schema_version,
            run: RunConfig {
                conditions: Condition::defaults(),
                criteria,
                vocabulary,
                gene_match: config.gene_match.unwrap_or_default(),
                max_results,
            },
            endpoint: config
                .endpoint
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            timeout: Duration::from_secs(timeout_secs),
            output: Utf8PathBuf::from(
                config
                    .output
                    .unwrap_or_else(|| EXPORT_FILE_NAME.to_string()),
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_config() {
        let resolved = ConfigLoader::resolve_config(Config::default()).unwrap();
        assert_eq!(resolved.schema_version, 1);
        assert_eq!(resolved.run.max_results, 100);
        assert_eq!(resolved.run.conditions.len(), 2);
        assert_eq!(resolved.run.gene_match, GeneMatch::All);
        assert_eq!(resolved.run.criteria.status_match, StatusMatch::Exact);
        let statuses = resolved.run.criteria.statuses.unwrap();
        assert!(statuses.contains("Recruiting"));
        assert!(statuses.contains("Active, not recruiting"));
        assert_eq!(resolved.output.as_str(), EXPORT_FILE_NAME);
    }

    #[test]
    fn overrides_replace_file_values() {
        let config = Config {
            statuses: Some(vec!["Completed".to_string()]),
            phase: Some("Phase 1".to_string()),
            ..Config::default()
        };
        let overrides = ConfigOverrides {
            statuses: vec!["Recruiting".to_string()],
            phase: Some("Phase 2".to_string()),
            industry_only: Some(true),
            ..ConfigOverrides::default()
        };
        let resolved = ConfigLoader::resolve_config(config.apply(overrides)).unwrap();
        let statuses = resolved.run.criteria.statuses.unwrap();
        assert_eq!(statuses.len(), 1);
        assert!(statuses.contains("Recruiting"));
        assert_eq!(resolved.run.criteria.phase.as_deref(), Some("Phase 2"));
        assert!(resolved.run.criteria.industry_only);
    }
}
