//! qplan - render captured execution plans in the terminal
//!
//! Usage:
//!   qplan --dialect firebird plan.txt
//!   mysql -N -e "EXPLAIN FORMAT=JSON SELECT ..." | qplan --dialect mysql
//!   qplan --dialect mysql --format json plan.json

mod config;
mod logging;
mod source;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use config::CliConfig;
use qplan_analyzer::{Dialect, Plan, explain_with, render_tree};
use source::CapturedPlanSource;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "qplan", version, about = "Parse and display query execution plans")]
struct Cli {
    /// Configuration file (defaults to <config dir>/qplan/config.toml)
    #[arg(long, env = "QPLAN_CONFIG")]
    config: Option<PathBuf>,

    /// Dialect of the captured plan: firebird or mysql
    #[arg(short, long, default_value = "firebird", value_parser = str::parse::<Dialect>)]
    dialect: Dialect,

    /// Query the plan belongs to
    #[arg(short, long, default_value = "")]
    query: String,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Tree)]
    format: OutputFormat,

    /// File holding the plan (reads stdin when omitted)
    file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Indented plan tree
    Tree,
    /// Plan serialized as JSON
    Json,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = CliConfig::load(cli.config.as_deref())?;
    let _log_guard = logging::init(&config.logging)?;

    let source = CapturedPlanSource::new(cli.file);
    let dialect = cli.dialect;

    match explain_with(&source, dialect, &config.analyzer, &cli.query).await {
        Ok(plan) => {
            print!("{}", format_plan(&plan, cli.format)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            tracing::error!(error = %err, %dialect, "cannot display execution plan");
            eprintln!("cannot display execution plan: {err}");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn format_plan(plan: &Plan, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Tree => Ok(render_tree(plan)),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(plan).context("Failed to serialize plan")?;
            Ok(format!("{json}\n"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qplan_analyzer::{AnalyzerConfig, parse_plan};

    #[test]
    fn test_cli_arguments() {
        let cli = Cli::try_parse_from(["qplan", "-d", "MySQL", "--format", "json", "plan.json"])
            .unwrap();
        assert_eq!(cli.dialect, Dialect::MySql);
        assert!(matches!(cli.format, OutputFormat::Json));
        assert_eq!(cli.file, Some(PathBuf::from("plan.json")));

        let cli = Cli::try_parse_from(["qplan"]).unwrap();
        assert_eq!(cli.dialect, Dialect::Firebird);
        assert!(cli.file.is_none());
    }

    #[test]
    fn test_unknown_dialect_is_rejected() {
        let err = Cli::try_parse_from(["qplan", "--dialect", "oracle"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_format_plan_as_json_round_trips() {
        let plan = parse_plan(
            Dialect::Firebird,
            &AnalyzerConfig::default(),
            "SELECT 1",
            "PLAN SORT (T1 NATURAL)",
        )
        .unwrap();

        let json = format_plan(&plan, OutputFormat::Json).unwrap();
        let restored: Plan = serde_json::from_str(&json).unwrap();
        assert!(restored.structurally_eq(&plan));
        assert_eq!(restored.query(), "SELECT 1");
    }

    #[test]
    fn test_format_plan_as_tree() {
        let plan = parse_plan(
            Dialect::Firebird,
            &AnalyzerConfig::default(),
            "",
            "PLAN (T1 NATURAL)",
        )
        .unwrap();
        assert_eq!(
            format_plan(&plan, OutputFormat::Tree).unwrap(),
            "PLAN (T1 NATURAL)\n  T1 NATURAL\n"
        );
    }
}
