use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gwa_codec::{GwaDocument, expand_case_expression};
use gwa_model::{ModelSummary, Registry};
use gwa_sync::{MemoryProxy, PassReport, SyncSession, SyncSettings, processing_order};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gwa-cli", version, about = "Inspect and synchronize GWA models")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode every record of a .gwa file and count what was found
    Summarize {
        file: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Run one synchronization pass against a .gwa file
    Sync {
        file: PathBuf,
        /// Settings file (TOML)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Keywords to load; defaults to the configured ones
        #[arg(long, value_delimiter = ',')]
        keywords: Vec<String>,
        #[arg(long)]
        json: bool,
    },
    /// Expand a load case / combination description
    Expand { expression: String },
    /// Print the order record types are decoded in
    Order { keywords: Vec<String> },
}

fn print_summary(summary: &ModelSummary) {
    println!("total_records: {}", summary.total_records);
    println!("with_application_id: {}", summary.with_application_id);
    println!("node_rows: {}", summary.node_rows);
    println!("element_rows: {}", summary.element_rows);
    println!("member_rows: {}", summary.member_rows);
    println!("section_components: {}", summary.section_components);
    println!("load_cases: {}", summary.load_cases);
    println!("combinations: {}", summary.combinations);
    println!("failed_records: {}", summary.failed_records);
    for (keyword, count) in &summary.keyword_counts {
        println!("  {keyword}: {count}");
    }
    if !summary.unsupported_keywords.is_empty() {
        println!("unsupported: {}", summary.unsupported_keywords.join(", "));
    }
}

fn print_report(report: &PassReport) {
    println!("loaded: {}", report.loaded);
    println!("decoded: {}", report.decoded);
    println!("deleted: {}", report.deleted);
    println!("conflicts: {}", report.conflicts.len());
    println!("reference_errors: {}", report.reference_errors.len());
    println!("format_errors: {}", report.format_errors.len());
    println!("unsupported: {}", report.unsupported_count());
    for advisory in report.advisories() {
        println!("  {advisory}");
    }
}

fn summarize(path: &Path) -> Result<ModelSummary> {
    let document = GwaDocument::parse_file(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let registry = Registry::standard();

    let mut decoded = Vec::new();
    let mut failed = Vec::new();
    for record in &document.records {
        match registry.decode(&record.gwa) {
            Ok(object) => decoded.push(object),
            Err(err) => {
                info!(line = record.line, "{err}");
                failed.push(record.header.keyword.clone());
            }
        }
    }

    let mut summary = ModelSummary::from_objects(&decoded);
    for keyword in &failed {
        summary.record_failure(keyword);
    }
    Ok(summary)
}

fn sync(path: &Path, config: Option<&Path>, keywords: &[String]) -> Result<PassReport> {
    let settings = match config {
        Some(config) => SyncSettings::load(config)
            .with_context(|| format!("loading settings from {}", config.display()))?,
        None => SyncSettings::default(),
    };
    let proxy = MemoryProxy::from_file(path)?;
    let mut session = SyncSession::new(settings, proxy)?;
    session.load(keywords)?;
    session.apply_deletions(keywords)?;
    session.decode_pass()?;
    Ok(session.finish())
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Summarize { file, json } => {
            let summary = summarize(&file)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary);
            }
        }
        Command::Sync {
            file,
            config,
            keywords,
            json,
        } => {
            let report = sync(&file, config.as_deref(), &keywords)?;
            if json {
                println!("{}", report.to_json()?);
            } else {
                print_report(&report);
            }
        }
        Command::Expand { expression } => {
            for case in expand_case_expression(&expression)? {
                println!("{}\t{}", case.case, case.factor);
            }
        }
        Command::Order { keywords } => {
            let registry = Registry::standard();
            let keywords = if keywords.is_empty() {
                registry.keywords().map(str::to_string).collect()
            } else {
                keywords
            };
            for (i, level) in processing_order(registry, &keywords)?.iter().enumerate() {
                println!("{}: {}", i + 1, level.join(" "));
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(1)
        }
    }
}
