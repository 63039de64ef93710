use std::fs;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::Builder;

use crate::domain::EXPORT_FILE_NAME;
use crate::error::TrialsError;

/// Where the workbook goes: `output` itself, or the fixed file name inside it
/// when `output` is an existing directory.
pub fn resolve_output_path(output: &Utf8Path) -> Utf8PathBuf {
    if output.is_dir() {
        output.join(EXPORT_FILE_NAME)
    } else {
        output.to_path_buf()
    }
}

/// Writes `bytes` next to `destination` first and renames it into place, so a
/// reader never sees a half-written file.
pub fn write_atomic(destination: &Utf8Path, bytes: &[u8]) -> Result<(), TrialsError> {
    let parent = match destination.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent.to_path_buf(),
        _ => Utf8PathBuf::from("."),
    };
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| TrialsError::Filesystem(format!("create {parent}: {err}")))?;

    let mut temp = Builder::new()
        .prefix(".kira-trials")
        .suffix(".xlsx.tmp")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| TrialsError::Filesystem(err.to_string()))?;
    temp.write_all(bytes)
        .map_err(|err| TrialsError::Filesystem(err.to_string()))?;
    temp.as_file()
        .sync_all()
        .map_err(|err| TrialsError::Filesystem(err.to_string()))?;
    temp.persist(destination.as_std_path())
        .map_err(|err| TrialsError::Filesystem(format!("write {destination}: {}", err.error)))?;
    Ok(())
}
