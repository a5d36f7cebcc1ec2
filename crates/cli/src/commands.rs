// Copyright 2026 Benchwatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! Subcommand implementations.

use crate::ci::{self, RunArgs};
use crate::config::PipelineConfig;
use crate::Outcome;
use anyhow::{bail, Context, Result};
use benchwatch_adapters::github_actions::{self, AnnotationLevel};
use benchwatch_adapters::slack::{self, Notification, NotificationSink, SlackNotifier};
use benchwatch_adapters::system_load::{LoadSampler, ProcLoadSampler};
use benchwatch_adapters::test_vectors;
use benchwatch_benchmarks::{baseline, io, markdown, regression, BaselineOutcome, ChangeKind, Metric};
use benchwatch_storage::history::SHORT_SHA_LEN;
use benchwatch_storage::{CommitEntry, GithubContentsStore, HistorySynchronizer, MemoryStore, SyncRequest};
use chrono::Utc;
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Options of `benchwatch baseline`.
#[derive(Args, Debug, Clone, Default)]
pub struct BaselineArgs {
    /// Directory of timestamped historical snapshots
    #[arg(long, env = "RESULTS_DIR")]
    pub results_dir: Option<PathBuf>,

    /// Number of most recent snapshots to average
    #[arg(long, env = "ROLLING_WINDOW")]
    pub window: Option<usize>,

    /// Baseline file to write
    #[arg(long)]
    pub output: Option<PathBuf>,
}

/// Options of `benchwatch detect`.
#[derive(Args, Debug, Clone, Default)]
pub struct DetectArgs {
    /// Result file of the current run
    #[arg(long, env = "RESULTS_FILE")]
    pub results: Option<PathBuf>,

    /// Baseline file to compare against
    #[arg(long, env = "BASELINE_PATH")]
    pub baseline: Option<PathBuf>,

    /// Relative change that counts as significant
    #[arg(long, env = "REGRESSION_THRESHOLD")]
    pub threshold: Option<f64>,

    /// Exit with status 2 when a regression is detected
    #[arg(long)]
    pub fail_on_regression: bool,

    /// Step output file
    #[arg(long, env = "GITHUB_OUTPUT")]
    pub github_output: Option<PathBuf>,
}

/// Options of `benchwatch push`.
#[derive(Args, Debug, Clone, Default)]
pub struct PushArgs {
    /// Result file of the current run
    #[arg(long, env = "RESULTS_FILE")]
    pub results: Option<PathBuf>,

    /// Implementation the results belong to
    #[arg(long, env = "IMPLEMENTATION")]
    pub implementation: String,

    /// Commit the results were measured at
    #[arg(long, env = "GITHUB_SHA")]
    pub sha: Option<String>,

    /// Commit subject; read from `git log` when omitted
    #[arg(long)]
    pub message: Option<String>,

    /// Dashboard repository, `owner/name`
    #[arg(long, env = "DASHBOARD_REPO")]
    pub dashboard_repo: Option<String>,

    /// Token with write access to the dashboard repository
    #[arg(long, env = "DASHBOARD_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Source repository shown on the dashboard
    #[arg(long, env = "SOURCE_REPO")]
    pub source_repo: Option<String>,

    /// Comma-separated tags, e.g. `gpu,cuda`
    #[arg(long, env = "TAGS")]
    pub tags: Option<String>,

    /// Merge into an empty in-memory store and print the documents
    #[arg(long)]
    pub dry_run: bool,

    #[command(flatten)]
    pub run: RunArgs,
}

/// Options of `benchwatch summary` and `benchwatch verify`.
#[derive(Args, Debug, Clone, Default)]
pub struct ResultsArgs {
    /// Result file of the current run
    #[arg(long, env = "RESULTS_FILE")]
    pub results: Option<PathBuf>,
}

/// Options of `benchwatch system-load`.
#[derive(Args, Debug, Clone, Default)]
pub struct SystemLoadArgs {
    /// Report file to write
    #[arg(long, env = "SYSTEM_LOAD_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Normalized CPU load warning threshold
    #[arg(long, env = "CPU_LOAD_THRESHOLD")]
    pub cpu_threshold: Option<f64>,

    /// Memory usage warning threshold
    #[arg(long, env = "MEMORY_THRESHOLD")]
    pub memory_threshold: Option<f64>,

    /// Step output file
    #[arg(long, env = "GITHUB_OUTPUT")]
    pub github_output: Option<PathBuf>,
}

/// Options of `benchwatch notify`.
#[derive(Args, Debug, Clone, Default)]
pub struct NotifyArgs {
    /// Result file of the current run
    #[arg(long, env = "RESULTS_FILE")]
    pub results: Option<PathBuf>,

    /// Classification written by `detect`; empty reports a failed run
    #[arg(long, env = "CHANGE_TYPE")]
    pub change_type: Option<String>,

    /// Slack incoming webhook
    #[arg(long, env = "SLACK_WEBHOOK_URL", hide_env_values = true)]
    pub webhook: Option<String>,

    /// Markdown analysis to excerpt
    #[arg(long, env = "AI_ANALYSIS_OUTPUT")]
    pub analysis: Option<PathBuf>,

    /// Implementation name, used when the results do not carry one
    #[arg(long, env = "IMPLEMENTATION")]
    pub implementation: Option<String>,

    /// Commit SHA, used when the results do not carry one
    #[arg(long, env = "GITHUB_SHA")]
    pub sha: Option<String>,

    #[command(flatten)]
    pub run: RunArgs,
}

fn results_path(arg: Option<&Path>, config: &PipelineConfig) -> PathBuf {
    arg.map(Path::to_path_buf)
        .unwrap_or_else(|| config.paths.results_file.clone())
}

/// Compute the rolling baseline and write it next to the history.
pub fn baseline(args: &BaselineArgs, config: &PipelineConfig) -> Result<Outcome> {
    let results_dir = args
        .results_dir
        .clone()
        .unwrap_or_else(|| config.paths.results_dir.clone());
    let output = match (&args.output, &args.results_dir) {
        (Some(output), _) => output.clone(),
        (None, Some(dir)) => dir.join(io::BASELINE_FILE),
        (None, None) => config.paths.baseline_path(),
    };
    let mut baseline_config = config.baseline.clone();
    if let Some(window) = args.window {
        baseline_config.window = window;
    }

    if !results_dir.is_dir() {
        println!("Results directory not found: {}", results_dir.display());
        return Ok(Outcome::Success);
    }

    let outcome = baseline::compute_rolling_baseline(&results_dir, &baseline_config)
        .with_context(|| format!("failed to load history from {}", results_dir.display()))?;

    baseline::write_baseline(&outcome, &output)
        .with_context(|| format!("failed to write {}", output.display()))?;

    match &outcome {
        BaselineOutcome::Empty => {
            println!("No historical results in {}", results_dir.display());
        }
        BaselineOutcome::SingleSample(_) => {
            println!("Using most recent result as baseline");
        }
        BaselineOutcome::RollingAverage(snapshot) => {
            let samples = snapshot
                .metadata
                .get(baseline::SAMPLE_COUNT_KEY)
                .and_then(|v| v.as_u64())
                .unwrap_or_default();
            println!("Rolling baseline calculated from {} results", samples);
            for (name, bench) in &snapshot.benchmarks {
                match bench.metric(Metric::Latency) {
                    Some(latency) => println!("  {}: {} ns (avg)", name, latency.value),
                    None => println!("  {}: N/A", name),
                }
            }
        }
    }
    Ok(Outcome::Success)
}

/// Classify the current run against the baseline.
pub fn detect(args: &DetectArgs, config: &PipelineConfig) -> Result<Outcome> {
    let results = results_path(args.results.as_deref(), config);
    let baseline_path = args
        .baseline
        .clone()
        .unwrap_or_else(|| config.paths.baseline_path());
    let mut regression_config = config.regression.clone();
    if let Some(threshold) = args.threshold {
        regression_config.threshold = threshold;
    }

    let current = io::read_snapshot(&results)?;
    let Some(base) = io::read_optional_snapshot(&baseline_path)? else {
        println!("No baseline found, skipping regression detection");
        return Ok(Outcome::Success);
    };

    let report = regression::detect(&current, &base, &regression_config);
    for change in report.flagged() {
        let level = match change.kind {
            ChangeKind::Regression => AnnotationLevel::Warning,
            _ => AnnotationLevel::Notice,
        };
        println!("{}", github_actions::annotation(level, &change.message()));
    }

    let classification = report.classification;
    let mut outputs = Vec::new();
    if classification.is_significant() {
        outputs.push(("has_significant_change", "true".to_string()));
        outputs.push(("change_type", classification.as_output_value().to_string()));
    }
    github_actions::write_outputs(args.github_output.as_deref(), &outputs)?;

    info!(
        compared = report.changes.len(),
        flagged = report.flagged().count(),
        %classification,
        "Regression detection finished"
    );

    if args.fail_on_regression && report.has_regression() {
        eprintln!("{}", "Benchmark regression detected".red().bold());
        return Ok(Outcome::RegressionDetected);
    }
    Ok(Outcome::Success)
}

/// Record the run in the dashboard history and manifest.
pub async fn push(args: &PushArgs, config: &PipelineConfig) -> Result<Outcome> {
    let results = results_path(args.results.as_deref(), config);
    let snapshot = io::read_snapshot(&results)?;

    let sha = ci::non_empty(args.sha.as_deref())
        .context("commit SHA is required (--sha or GITHUB_SHA)")?;
    let message = match &args.message {
        Some(message) => message.clone(),
        None => ci::head_commit_subject().await,
    };
    let timestamp = Utc::now().to_rfc3339();
    let entry = CommitEntry::from_snapshot(&snapshot, sha, message, timestamp.clone(), args.run.run_url())?;

    let request = SyncRequest {
        implementation: args.implementation.trim().to_string(),
        repo: Some(ci::source_repo(
            args.source_repo.as_deref(),
            &args.run,
            args.implementation.trim(),
        )),
        tags: ci::parse_tags(args.tags.as_deref()),
        entry,
        timestamp,
    };

    if args.dry_run {
        let synchronizer = HistorySynchronizer::new(MemoryStore::new(), config.sync.clone());
        let report = synchronizer.synchronize(&request).await?;
        for path in [&report.history_path, &report.manifest_path] {
            if let Some(content) = synchronizer.store().content(path) {
                println!("# {}\n{}", path, content);
            }
        }
        return Ok(Outcome::Success);
    }

    let mut github = config.github.clone();
    if let Some(repo) = ci::non_empty(args.dashboard_repo.as_deref()) {
        github.repository = repo.to_string();
    }
    if let Some(token) = ci::non_empty(args.token.as_deref()) {
        github.token = token.to_string();
    }
    if github.repository.is_empty() {
        bail!("dashboard repository is required (--dashboard-repo or DASHBOARD_REPO)");
    }
    if github.token.is_empty() {
        bail!("dashboard token is required (--token or DASHBOARD_TOKEN)");
    }

    let store = GithubContentsStore::new(github)?;
    let synchronizer = HistorySynchronizer::new(store, config.sync.clone());
    let report = synchronizer.synchronize(&request).await?;

    println!(
        "Pushed {} to {} ({} commits)",
        request.entry.short_sha,
        report.history_path,
        report.commit_count
    );
    println!("Updated {}", report.manifest_path);
    Ok(Outcome::Success)
}

/// Print the Markdown step summary.
pub fn summary(args: &ResultsArgs, config: &PipelineConfig) -> Result<Outcome> {
    let snapshot = io::read_snapshot(results_path(args.results.as_deref(), config))?;
    print!("{}", markdown::generate_summary(&snapshot));
    Ok(Outcome::Success)
}

/// Check that every benchmark verified its test vectors.
pub fn verify(args: &ResultsArgs, config: &PipelineConfig) -> Result<Outcome> {
    let snapshot = io::read_snapshot(results_path(args.results.as_deref(), config))?;
    let report = test_vectors::verify(&snapshot);

    if report.passed() {
        println!("{}", report.summary().green());
        Ok(Outcome::Success)
    } else {
        println!(
            "{}",
            github_actions::annotation(AnnotationLevel::Error, &report.summary())
        );
        Ok(Outcome::Failed)
    }
}

/// Sample system load and write the report.
pub fn system_load(args: &SystemLoadArgs, config: &PipelineConfig) -> Result<Outcome> {
    let mut thresholds = config.load.clone();
    if let Some(cpu) = args.cpu_threshold {
        thresholds.cpu = cpu;
    }
    if let Some(memory) = args.memory_threshold {
        thresholds.memory = memory;
    }
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| config.paths.system_load_output.clone());

    let report = ProcLoadSampler::default().sample(&thresholds)?;
    write_json(&report, &output)?;

    if report.cpu.warning {
        let message = format!(
            "High CPU load detected: {:.1}% (threshold: {:.0}%)",
            report.cpu.normalized_load * 100.0,
            thresholds.cpu * 100.0
        );
        println!("{}", github_actions::annotation(AnnotationLevel::Warning, &message));
    }
    if report.memory.warning {
        let message = format!(
            "High memory usage detected: {:.1}% (threshold: {:.0}%)",
            report.memory.usage_ratio * 100.0,
            thresholds.memory * 100.0
        );
        println!("{}", github_actions::annotation(AnnotationLevel::Warning, &message));
    }

    println!(
        "CPU load: {:.1}% ({:.2} / {} cores)",
        report.cpu.normalized_load * 100.0,
        report.cpu.load_avg_1m,
        report.cpu.cpu_count
    );
    println!(
        "Memory: {:.1}% ({} / {} MB)",
        report.memory.usage_ratio * 100.0,
        report.memory.used_mb,
        report.memory.total_mb
    );

    github_actions::write_outputs(args.github_output.as_deref(), &report.outputs())?;
    Ok(Outcome::Success)
}

fn write_json<T: serde::Serialize>(value: &T, path: &Path) -> Result<()> {
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

/// Send the run notification to Slack.
pub async fn notify(args: &NotifyArgs, config: &PipelineConfig) -> Result<Outcome> {
    let mut slack_config = config.slack.clone();
    if let Some(webhook) = ci::non_empty(args.webhook.as_deref()) {
        slack_config.webhook_url = Some(webhook.to_string());
    }
    let Some(notifier) = SlackNotifier::from_config(&slack_config)? else {
        println!("Slack webhook not set, skipping");
        return Ok(Outcome::Success);
    };

    let notification = build_notification(args, config);
    notifier.send(&notification).await?;
    Ok(Outcome::Success)
}

fn build_notification(args: &NotifyArgs, config: &PipelineConfig) -> Notification {
    let results = results_path(args.results.as_deref(), config);
    let identified = match io::read_snapshot(&results) {
        Ok(snapshot) => {
            let identity = snapshot
                .metadata_str("implementation")
                .zip(snapshot.metadata_str("commit_sha"))
                .map(|(implementation, commit)| (implementation.to_string(), commit.to_string()));
            if identity.is_none() {
                warn!(
                    path = %results.display(),
                    "Results lack implementation or commit_sha, sending notification without them"
                );
            }
            identity.map(|identity| (identity, snapshot))
        }
        Err(e) => {
            warn!(error = %e, "Results unavailable, sending notification without them");
            None
        }
    };

    let ((implementation, commit), snapshot) = match identified {
        Some((identity, snapshot)) => (identity, Some(snapshot)),
        None => {
            let implementation = ci::non_empty(args.implementation.as_deref())
                .unwrap_or("unknown")
                .to_string();
            let commit = ci::non_empty(args.sha.as_deref())
                .map(|sha| sha.chars().take(SHORT_SHA_LEN).collect())
                .unwrap_or_else(|| "unknown".to_string());
            ((implementation, commit), None)
        }
    };

    let analysis = snapshot.as_ref().and_then(|_| {
        let path = args
            .analysis
            .clone()
            .unwrap_or_else(|| config.paths.analysis_file.clone());
        fs::read_to_string(&path)
            .ok()
            .and_then(|markdown| slack::extract_analysis_summary(&markdown))
    });

    Notification {
        classification: ci::parse_change_type(args.change_type.as_deref()),
        implementation,
        commit,
        run_url: args
            .run
            .run_url()
            .unwrap_or_else(|| args.run.server_url.clone()),
        benchmarks: snapshot.map(|s| s.benchmarks).unwrap_or_default(),
        analysis,
    }
}
