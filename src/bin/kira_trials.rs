use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use kira_trials::app::{App, RunResult};
use kira_trials::config::{ConfigLoader, ConfigOverrides};
use kira_trials::domain::{GeneMatch, StatusMatch};
use kira_trials::error::TrialsError;
use kira_trials::fs_util::{resolve_output_path, write_atomic};
use kira_trials::output::{ConsoleProgress, JsonOutput, OutputMode, status_entries};
use kira_trials::registry::RegistryHttpClient;

#[derive(Parser)]
#[command(name = "kira-trials")]
#[command(about = "HSP & PLS clinical trial extractor (ClinicalTrials.gov to Excel)")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    non_interactive: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Fetch HSP and PLS trials and write the Excel workbook")]
    Fetch(FetchArgs),
    #[command(about = "List trial status values and the default selection")]
    Statuses,
}

#[derive(Args, Clone, Default)]
struct FetchArgs {
    #[arg(long)]
    config: Option<String>,

    /// Keep trials with this overall status (repeatable)
    #[arg(long = "status")]
    statuses: Vec<String>,

    /// Do not filter on status
    #[arg(long, conflicts_with = "statuses")]
    all_statuses: bool,

    #[arg(long)]
    status_match: Option<StatusMatch>,

    /// Keep trials whose phase contains this text, e.g. "Phase 2"
    #[arg(long)]
    phase: Option<String>,

    /// Keep only trials whose sponsor of record looks like a company
    #[arg(long)]
    industry_only: bool,

    /// Turn off an industry-only filter set in the config file
    #[arg(long, conflicts_with = "industry_only")]
    no_industry_only: bool,

    /// CSV or TSV file with a `Gene` column replacing the built-in gene list
    #[arg(long)]
    genes: Option<String>,

    #[arg(long)]
    gene_match: Option<GeneMatch>,

    #[arg(long)]
    max_results: Option<u32>,

    /// Output file or directory
    #[arg(long, short)]
    output: Option<String>,
}

impl From<FetchArgs> for ConfigOverrides {
    fn from(args: FetchArgs) -> Self {
        ConfigOverrides {
            statuses: args.statuses,
            all_statuses: args.all_statuses,
            status_match: args.status_match,
            phase: args.phase,
            industry_only: match (args.industry_only, args.no_industry_only) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            },
            gene_file: args.genes,
            gene_match: args.gene_match,
            max_results: args.max_results,
            output: args.output,
        }
    }
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<TrialsError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &TrialsError) -> u8 {
    match error {
        TrialsError::GeneFileRead(_)
        | TrialsError::MissingGeneColumn(_)
        | TrialsError::GeneFileParse(_)
        | TrialsError::ConfigRead(_)
        | TrialsError::ConfigParse(_)
        | TrialsError::InvalidConfig(_) => 2,
        TrialsError::RegistryHttp(_)
        | TrialsError::RegistryStatus { .. }
        | TrialsError::RegistryResponse(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    match cli.command {
        Some(Commands::Fetch(args)) => run_fetch(args, output_mode),
        Some(Commands::Statuses) => run_statuses(output_mode),
        None => run_fetch(FetchArgs::default(), output_mode),
    }
}

fn run_fetch(args: FetchArgs, output_mode: OutputMode) -> miette::Result<()> {
    let config_path = args.config.clone();
    let resolved = ConfigLoader::resolve(config_path.as_deref(), args.into())?;
    tracing::debug!(
        schema_version = resolved.schema_version,
        endpoint = %resolved.endpoint,
        "configuration resolved"
    );

    let registry = RegistryHttpClient::with_endpoint(&resolved.endpoint, resolved.timeout)?;
    let app = App::new(registry);

    let result = match output_mode {
        OutputMode::NonInteractive => app.run(&resolved.run, &JsonOutput)?,
        OutputMode::Interactive => app.run(&resolved.run, &ConsoleProgress)?,
    };

    let path = resolve_output_path(&resolved.output);
    write_atomic(&path, &result.bytes)?;

    match output_mode {
        OutputMode::NonInteractive => {
            JsonOutput::print_run(&result, path.as_str()).into_diagnostic()
        }
        OutputMode::Interactive => {
            print_run_summary(&result, path.as_str());
            Ok(())
        }
    }
}

fn run_statuses(output_mode: OutputMode) -> miette::Result<()> {
    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_statuses().into_diagnostic(),
        OutputMode::Interactive => {
            for entry in status_entries() {
                let marker = if entry.default { "*" } else { " " };
                println!("{marker} {}", entry.status);
            }
            println!("(* selected by default)");
            Ok(())
        }
    }
}

fn print_run_summary(result: &RunResult, path: &str) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let cyan = "\x1b[36m";
    let red = "\x1b[31m";
    let reset = "\x1b[0m";

    let failed = result.failed_sheets().count();
    println!("{cyan}KIRA-TRIALS summary{reset}");
    println!("{green}Excel file ready: {path} ({} bytes){reset}", result.size_bytes);
    if failed == 0 {
        println!("{green}Fetch errors: 0{reset}");
    } else {
        println!("{yellow}Fetch errors: {failed}{reset}");
    }

    for sheet in &result.sheets {
        match &sheet.error {
            None => println!(
                "{cyan}  {}: {} of {} trials kept ({}){reset}",
                sheet.sheet_name, sheet.kept, sheet.fetched, sheet.condition
            ),
            Some(error) => println!(
                "{red}  {}: fetch failed, sheet left empty: {error}{reset}",
                sheet.sheet_name
            ),
        }
    }
}
