use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum TrialsError {
    #[error("registry request failed: {0}")]
    RegistryHttp(String),

    #[error("registry returned status {status}: {message}")]
    RegistryStatus { status: u16, message: String },

    #[error("unexpected registry response: {0}")]
    RegistryResponse(String),

    #[error("failed to read gene file at {0}")]
    GeneFileRead(PathBuf),

    #[error("gene file {0} has no `Gene` column")]
    #[diagnostic(help("the first row must contain a header named exactly `Gene`"))]
    MissingGeneColumn(PathBuf),

    #[error("failed to parse gene file: {0}")]
    GeneFileParse(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid config value: {0}")]
    InvalidConfig(String),

    #[error("spreadsheet export failed: {0}")]
    Export(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
