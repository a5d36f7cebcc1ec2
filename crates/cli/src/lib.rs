// Copyright 2026 Benchwatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! CLI for Benchwatch.
//!
//! Each subcommand is one step of a benchmark workflow: check the machine,
//! verify results, compute the baseline, detect regressions, publish to the
//! dashboard and notify.

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod ci;
pub mod commands;
pub mod config;
pub mod logging;

use anyhow::Context;
use clap::{Parser, Subcommand};
use commands::{BaselineArgs, DetectArgs, NotifyArgs, PushArgs, ResultsArgs, SystemLoadArgs};
use std::path::PathBuf;
use std::process::ExitCode;

/// Benchwatch CLI.
#[derive(Parser, Debug)]
#[command(name = "benchwatch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file; `benchwatch.toml` is used when present
    #[arg(long, global = true, env = "BENCHWATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = logging::LogFormat::Text)]
    pub log_format: logging::LogFormat,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Average recent historical results into `baseline.json`.
    Baseline(BaselineArgs),

    /// Compare the current results with the baseline.
    ///
    /// Prints one annotation per significant change and writes the
    /// `has_significant_change` and `change_type` step outputs.
    Detect(DetectArgs),

    /// Record the results in the dashboard history and manifest.
    Push(PushArgs),

    /// Print the Markdown step summary of the results.
    Summary(ResultsArgs),

    /// Fail unless every benchmark verified its test vectors.
    Verify(ResultsArgs),

    /// Check CPU load and memory usage before benchmarking.
    SystemLoad(SystemLoadArgs),

    /// Send the run notification to Slack.
    Notify(NotifyArgs),
}

/// How a command finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Completed normally
    Success,
    /// Completed, but the checked condition does not hold
    Failed,
    /// A regression was detected and the run is gated on it
    RegressionDetected,
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Success => ExitCode::SUCCESS,
            Outcome::Failed => ExitCode::FAILURE,
            Outcome::RegressionDetected => ExitCode::from(2),
        }
    }
}

/// Parse arguments and run the selected command.
pub async fn run() -> anyhow::Result<ExitCode> {
    // Load .env before parsing so env fallbacks see it.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    logging::init(cli.log_format);

    let config = config::PipelineConfig::load(cli.config.as_deref())
        .context("failed to load configuration")?;
    tracing::debug!(?config, "Loaded configuration");

    let outcome = match &cli.command {
        Commands::Baseline(args) => commands::baseline(args, &config)?,
        Commands::Detect(args) => commands::detect(args, &config)?,
        Commands::Push(args) => commands::push(args, &config).await?,
        Commands::Summary(args) => commands::summary(args, &config)?,
        Commands::Verify(args) => commands::verify(args, &config)?,
        Commands::SystemLoad(args) => commands::system_load(args, &config)?,
        Commands::Notify(args) => commands::notify(args, &config).await?,
    };

    Ok(outcome.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_detect() {
        let cli = Cli::try_parse_from([
            "benchwatch",
            "detect",
            "--results",
            "out.json",
            "--threshold",
            "0.2",
            "--fail-on-regression",
            "--log-format",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.log_format, logging::LogFormat::Json);
        match cli.command {
            Commands::Detect(args) => {
                assert_eq!(args.results, Some(PathBuf::from("out.json")));
                assert_eq!(args.threshold, Some(0.2));
                assert!(args.fail_on_regression);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_system_load() {
        let cli = Cli::try_parse_from(["benchwatch", "system-load", "--cpu-threshold", "0.9"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::SystemLoad(SystemLoadArgs { cpu_threshold: Some(t), .. }) if t == 0.9
        ));
    }
}
