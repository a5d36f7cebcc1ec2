// Copyright 2026 Benchwatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! Identity of the CI run invoking the pipeline.

use benchwatch_benchmarks::RunClassification;
use clap::Args;
use tracing::debug;

/// Default GitHub web host.
pub const DEFAULT_SERVER_URL: &str = "https://github.com";

/// Where the current workflow run lives.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Repository running the workflow, `owner/name`
    #[arg(long, env = "GITHUB_REPOSITORY")]
    pub repository: Option<String>,

    /// Workflow run id
    #[arg(long, env = "GITHUB_RUN_ID")]
    pub run_id: Option<String>,

    /// GitHub web host
    #[arg(long, env = "GITHUB_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    pub server_url: String,
}

impl RunArgs {
    /// Link to the workflow run, when both repository and run id are known.
    pub fn run_url(&self) -> Option<String> {
        let repository = non_empty(self.repository.as_deref())?;
        let run_id = non_empty(self.run_id.as_deref())?;
        Some(format!(
            "{}/{}/actions/runs/{}",
            self.server_url.trim_end_matches('/'),
            repository,
            run_id
        ))
    }

    /// Repository name without the owner.
    pub fn repository_name(&self) -> Option<&str> {
        non_empty(self.repository.as_deref()).and_then(|r| r.rsplit('/').next())
    }
}

pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Split a comma-delimited tag list, dropping blanks.
pub fn parse_tags(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Source repository shown in the manifest: the explicit value, else the
/// workflow repository's name, else the implementation name.
pub fn source_repo(explicit: Option<&str>, run: &RunArgs, implementation: &str) -> String {
    non_empty(explicit)
        .or_else(|| run.repository_name())
        .unwrap_or(implementation)
        .to_string()
}

/// Parse a `change_type` value; anything unrecognized reads as no change.
pub fn parse_change_type(value: Option<&str>) -> RunClassification {
    match value.map(str::trim) {
        Some("regression") => RunClassification::Regression,
        Some("improvement") => RunClassification::Improvement,
        Some("mixed") => RunClassification::Mixed,
        _ => RunClassification::None,
    }
}

/// Subject line of the checked-out commit, or empty if git is unavailable.
pub async fn head_commit_subject() -> String {
    let output = tokio::process::Command::new("git")
        .args(["log", "--format=%s", "-1"])
        .output()
        .await;

    match output {
        Ok(output) if output.status.success() => {
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        }
        Ok(output) => {
            debug!(status = %output.status, "git log failed");
            String::new()
        }
        Err(e) => {
            debug!(error = %e, "git not available");
            String::new()
        }
    }
}
