//! `codegraph` CLI.
//!
//! A thin `clap`-derived shell over the library: `build` materializes a
//! graph and prints its statistics, `query` runs a SPARQL-subset query
//! against a freshly built graph, and `check` evaluates a rule set. Each
//! subcommand is argument parsing plus a `serde_json` dump of an
//! already-serializable library type — no business logic lives here.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use codegraph::config::Config;
use codegraph::graph::GraphBuilder;
use codegraph::rules::{self, RuleFilter, Severity};

#[derive(Parser)]
#[command(name = "codegraph", version, about = "Ingest a source tree into a code-knowledge graph and query it")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the graph for a source tree and print summary statistics.
    Build {
        /// Root directory to scan.
        root: PathBuf,
        /// Also run the structural validator and report its warnings.
        #[arg(long)]
        validate: bool,
    },
    /// Run a SPARQL-subset query against a freshly built graph.
    Query {
        /// Root directory to scan.
        root: PathBuf,
        /// Query text, e.g. `PREFIX code: <...> SELECT ?m WHERE { ?m a code:Module }`.
        text: String,
    },
    /// Evaluate a rule set (JSON) against a freshly built graph.
    Check {
        /// Root directory to scan.
        root: PathBuf,
        /// Path to a rule set JSON file (§4.J).
        ruleset: PathBuf,
        /// Only evaluate rules carrying one of these tags (repeatable).
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Skip rules below this severity.
        #[arg(long)]
        min_severity: Option<SeverityArg>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SeverityArg {
    Info,
    Warning,
    Error,
}

impl From<SeverityArg> for Severity {
    fn from(value: SeverityArg) -> Self {
        match value {
            SeverityArg::Info => Severity::Info,
            SeverityArg::Warning => Severity::Warning,
            SeverityArg::Error => Severity::Error,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run(Cli::parse().command) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> anyhow::Result<ExitCode> {
    match command {
        Command::Build { root, validate } => build(&root, validate),
        Command::Query { root, text } => run_query(&root, &text),
        Command::Check { root, ruleset, tags, min_severity } => check(&root, &ruleset, tags, min_severity),
    }
}

fn load_config() -> Config {
    Config::load().unwrap_or_else(|_| Config::default())
}

fn build(root: &Path, validate: bool) -> anyhow::Result<ExitCode> {
    let report = GraphBuilder::new(load_config()).with_validation(validate).build(root)?;

    println!("{}", serde_json::to_string_pretty(&report.graph.statistics)?);

    if !report.scan_errors.is_empty() {
        eprintln!("{} scan error(s)", report.scan_errors.len());
    }
    if !report.warnings.is_empty() {
        eprintln!("{} parse warning(s)", report.warnings.len());
    }
    if let Some(validation) = &report.validation {
        eprintln!("{} validation warning(s)", validation.warnings.len());
    }

    Ok(ExitCode::SUCCESS)
}

fn run_query(root: &Path, text: &str) -> anyhow::Result<ExitCode> {
    let report = GraphBuilder::new(load_config()).build(root)?;
    let result = codegraph::query::query(&report.graph.store, text)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(ExitCode::SUCCESS)
}

fn check(
    root: &Path,
    ruleset_path: &Path,
    tags: Vec<String>,
    min_severity: Option<SeverityArg>,
) -> anyhow::Result<ExitCode> {
    let report = GraphBuilder::new(load_config()).build(root)?;

    let text = std::fs::read_to_string(ruleset_path)?;
    let ruleset = rules::parse_rule_set(&text).map_err(anyhow::Error::msg)?;
    let filter = RuleFilter { tags, min_severity: min_severity.map(Severity::from) };

    let result = rules::evaluate(&ruleset, &report.graph, &filter)?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(if result.success() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
