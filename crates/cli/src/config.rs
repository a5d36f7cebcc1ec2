// Copyright 2026 Benchwatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! Layered pipeline configuration.
//!
//! Values come from built-in defaults, then an optional `benchwatch.toml`
//! (or the file given with `--config`), then `BENCHWATCH__*` environment
//! variables, e.g. `BENCHWATCH__SYNC__MAX_ATTEMPTS=5`.

use benchwatch_adapters::{LoadThresholds, SlackConfig};
use benchwatch_benchmarks::io::{BASELINE_FILE, RESULTS_DIR, RESULTS_FILE};
use benchwatch_benchmarks::{BaselineConfig, RegressionConfig};
use benchwatch_storage::{GithubStoreConfig, SyncConfig};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "BENCHWATCH";

/// Name of the optional configuration file, without extension.
pub const CONFIG_FILE: &str = "benchwatch";

/// File locations used by the commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory of timestamped historical snapshots
    pub results_dir: PathBuf,
    /// Result file of the current run
    pub results_file: PathBuf,
    /// Baseline file; `<results_dir>/baseline.json` when unset
    pub baseline_file: Option<PathBuf>,
    /// Where the system load report is written
    pub system_load_output: PathBuf,
    /// Markdown analysis attached to notifications
    pub analysis_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from(RESULTS_DIR),
            results_file: PathBuf::from(RESULTS_FILE),
            baseline_file: None,
            system_load_output: PathBuf::from("system_load.json"),
            analysis_file: PathBuf::from("ai_analysis.md"),
        }
    }
}

impl PathsConfig {
    /// Effective baseline location.
    pub fn baseline_path(&self) -> PathBuf {
        self.baseline_file
            .clone()
            .unwrap_or_else(|| self.results_dir.join(BASELINE_FILE))
    }
}

/// Configuration of every pipeline component.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// File locations
    pub paths: PathsConfig,
    /// Rolling baseline
    pub baseline: BaselineConfig,
    /// Regression classification
    pub regression: RegressionConfig,
    /// History synchronization
    pub sync: SyncConfig,
    /// Dashboard repository access
    pub github: GithubStoreConfig,
    /// System load warnings
    pub load: LoadThresholds,
    /// Slack notifications
    pub slack: SlackConfig,
}

impl PipelineConfig {
    /// Load configuration from the optional file and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, Environment::with_prefix(ENV_PREFIX))
    }

    fn load_with(path: Option<&Path>, env: Environment) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(CONFIG_FILE).required(false),
        };

        Config::builder()
            .add_source(file)
            .add_source(env.separator("__").try_parsing(true))
            .build()?
            .try_deserialize()
    }
}
