//! Benchmark result types.
//!
//! This module provides the snapshot structures shared by the baseline
//! aggregator, the regression classifier and the history synchronizer.
//! A snapshot is the JSON document a benchmark harness writes for one run:
//!
//! ```json
//! {
//!   "metadata": { "implementation": "zkx", "commit_sha": "..." },
//!   "benchmarks": {
//!     "poseidon2": {
//!       "latency": { "value": 1520.5, "unit": "ns" },
//!       "throughput": { "value": 657680.0, "unit": "ops/s" },
//!       "test_vectors": { "verified": true }
//!     }
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// A single measured value with its unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricValue {
    /// Measured value.
    pub value: f64,
    /// Unit of the value (`ns`, `ops/s`, `bytes`, ...).
    pub unit: String,
}

impl MetricValue {
    /// Create a new metric value.
    pub fn new(value: f64, unit: impl Into<String>) -> Self {
        Self {
            value,
            unit: unit.into(),
        }
    }
}

/// Which way a metric has to move to count as a regression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Larger values are worse (latency, memory).
    IncreaseIsRegression,
    /// Smaller values are worse (throughput).
    DecreaseIsRegression,
}

/// The metrics tracked for every benchmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Time per operation.
    Latency,
    /// Operations per unit of time.
    Throughput,
    /// Memory consumed by the benchmark.
    Memory,
}

impl Metric {
    /// All metrics, in reporting order.
    pub const ALL: [Metric; 3] = [Metric::Latency, Metric::Throughput, Metric::Memory];

    /// JSON key of the metric.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Latency => "latency",
            Self::Throughput => "throughput",
            Self::Memory => "memory",
        }
    }

    /// Direction policy of the metric.
    pub fn direction(&self) -> Direction {
        match self {
            Self::Latency | Self::Memory => Direction::IncreaseIsRegression,
            Self::Throughput => Direction::DecreaseIsRegression,
        }
    }

    /// Label used when the metric regressed.
    pub fn regression_label(&self) -> &'static str {
        match self {
            Self::Latency => "slower",
            Self::Throughput => "lower",
            Self::Memory => "more",
        }
    }

    /// Label used when the metric improved.
    pub fn improvement_label(&self) -> &'static str {
        match self {
            Self::Latency => "faster",
            Self::Throughput => "higher",
            Self::Memory => "less",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Outcome of the test-vector check a harness ran alongside a benchmark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestVectors {
    /// Whether the benchmark produced the expected outputs.
    pub verified: bool,
}

/// Measurements of one named benchmark.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    /// Latency measurement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<MetricValue>,
    /// Throughput measurement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub throughput: Option<MetricValue>,
    /// Memory measurement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<MetricValue>,
    /// Test-vector verification outcome.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_vectors: Option<TestVectors>,
    /// Free-form harness metadata, carried through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl BenchmarkResult {
    /// Get the value recorded for `metric`, if any.
    pub fn metric(&self, metric: Metric) -> Option<&MetricValue> {
        match metric {
            Metric::Latency => self.latency.as_ref(),
            Metric::Throughput => self.throughput.as_ref(),
            Metric::Memory => self.memory.as_ref(),
        }
    }

    /// Set the value recorded for `metric`.
    pub fn set_metric(&mut self, metric: Metric, value: Option<MetricValue>) {
        match metric {
            Metric::Latency => self.latency = value,
            Metric::Throughput => self.throughput = value,
            Metric::Memory => self.memory = value,
        }
    }

    /// Builder-style helper used when assembling results in code.
    pub fn with_metric(mut self, metric: Metric, value: f64, unit: impl Into<String>) -> Self {
        self.set_metric(metric, Some(MetricValue::new(value, unit)));
        self
    }

    /// Whether the test vectors of this benchmark were verified.
    pub fn is_verified(&self) -> bool {
        self.test_vectors.as_ref().is_some_and(|tv| tv.verified)
    }
}

/// Raw platform description as written by benchmark harnesses.
///
/// Harnesses disagree on naming (`cpu` vs `cpu_vendor`), so every field is
/// optional here and normalized by the history layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPlatform {
    /// Operating system.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    /// CPU model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,
    /// CPU vendor, used when `cpu` is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_vendor: Option<String>,
    /// GPU model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu: Option<String>,
    /// GPU vendor, used when `gpu` is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu_vendor: Option<String>,
}

/// One run's worth of benchmark results, or a baseline built from several.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSnapshot {
    /// Run metadata (commit, implementation, baseline bookkeeping, ...).
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Platform description written at the top level by older harnesses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<RawPlatform>,
    /// Results keyed by benchmark name.
    pub benchmarks: BTreeMap<String, BenchmarkResult>,
}

impl ResultSnapshot {
    /// Create a snapshot from benchmarks with empty metadata.
    pub fn from_benchmarks(benchmarks: BTreeMap<String, BenchmarkResult>) -> Self {
        Self {
            metadata: Map::new(),
            platform: None,
            benchmarks,
        }
    }

    /// Get a benchmark by name.
    pub fn benchmark(&self, name: &str) -> Option<&BenchmarkResult> {
        self.benchmarks.get(name)
    }

    /// Platform of the run: `metadata.platform` first, then top-level `platform`.
    ///
    /// A `metadata.platform` value that is not a platform object is ignored.
    pub fn raw_platform(&self) -> Option<RawPlatform> {
        self.metadata
            .get("platform")
            .and_then(|value| serde_json::from_value(value.clone()).ok())
            .or_else(|| self.platform.clone())
    }

    /// A string field from the metadata block.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snapshot_parses_partial_benchmarks() {
        let snapshot: ResultSnapshot = serde_json::from_value(json!({
            "benchmarks": {
                "hash": {
                    "latency": {"value": 120.5, "unit": "ns"},
                    "test_vectors": {"verified": true}
                },
                "empty": {}
            }
        }))
        .unwrap();

        let hash = snapshot.benchmark("hash").unwrap();
        assert_eq!(hash.latency, Some(MetricValue::new(120.5, "ns")));
        assert!(hash.throughput.is_none());
        assert!(hash.is_verified());
        assert!(!snapshot.benchmark("empty").unwrap().is_verified());
        assert!(snapshot.metadata.is_empty());
    }

    #[test]
    fn test_non_numeric_metric_is_rejected() {
        let parsed = serde_json::from_value::<ResultSnapshot>(json!({
            "benchmarks": {"hash": {"latency": {"value": "fast", "unit": "ns"}}}
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_missing_benchmarks_is_rejected() {
        let parsed = serde_json::from_value::<ResultSnapshot>(json!({"metadata": {}}));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_platform_prefers_metadata() {
        let snapshot: ResultSnapshot = serde_json::from_value(json!({
            "metadata": {"platform": {"os": "linux", "cpu_vendor": "AMD"}},
            "platform": {"os": "macos"},
            "benchmarks": {}
        }))
        .unwrap();

        let platform = snapshot.raw_platform().unwrap();
        assert_eq!(platform.os.as_deref(), Some("linux"));
        assert_eq!(platform.cpu_vendor.as_deref(), Some("AMD"));
    }

    #[test]
    fn test_metric_directions() {
        assert_eq!(Metric::Latency.direction(), Direction::IncreaseIsRegression);
        assert_eq!(Metric::Memory.direction(), Direction::IncreaseIsRegression);
        assert_eq!(Metric::Throughput.direction(), Direction::DecreaseIsRegression);
        assert_eq!(Metric::Throughput.regression_label(), "lower");
    }
}
