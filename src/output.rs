use std::io::{self, Write};

use serde::Serialize;

use crate::app::{ProgressEvent, ProgressSink, RunResult};
use crate::domain::{DEFAULT_STATUSES, STATUS_OPTIONS};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeliveredRun<'a> {
    pub path: &'a str,
    #[serde(flatten)]
    pub result: &'a RunResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusEntry {
    pub status: &'static str,
    pub default: bool,
}

pub fn status_entries() -> Vec<StatusEntry> {
    STATUS_OPTIONS
        .iter()
        .copied()
        .map(|status| StatusEntry {
            status,
            default: DEFAULT_STATUSES.contains(&status),
        })
        .collect()
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_run(result: &RunResult, path: &str) -> io::Result<()> {
        Self::print_json(&DeliveredRun { path, result })
    }

    pub fn print_statuses() -> io::Result<()> {
        Self::print_json(&status_entries())
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// Prints progress lines to stderr while a run is going.
pub struct ConsoleProgress;

impl ProgressSink for ConsoleProgress {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => eprintln!("{} ({} ms)", event.message, elapsed.as_millis()),
            None => eprintln!("{}", event.message),
        }
    }
}
