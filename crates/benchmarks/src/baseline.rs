//! Rolling baseline computation.
//!
//! A baseline is the mean of the most recent `window` historical snapshots,
//! benchmark by benchmark and metric by metric. `memory` is averaged along
//! with latency and throughput, so averaged baselines also carry a memory
//! figure for the classifier to compare against.
//!
//! With fewer than [`MIN_BASELINE_SAMPLES`] snapshots nothing is averaged:
//! the newest history document is written back as read, unknown fields
//! included, and the caller is told so through
//! [`BaselineOutcome::SingleSample`].

use crate::io::{self, SnapshotDocument};
use crate::result::{BenchmarkResult, Metric, MetricValue, ResultSnapshot};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Fewest historical snapshots that get averaged.
pub const MIN_BASELINE_SAMPLES: usize = 2;

/// Value of `metadata.baseline_type` on averaged baselines.
pub const ROLLING_AVERAGE: &str = "rolling_average";

/// Metadata key naming how a baseline was built.
pub const BASELINE_TYPE_KEY: &str = "baseline_type";

/// Metadata key holding the number of averaged snapshots.
pub const SAMPLE_COUNT_KEY: &str = "sample_count";

/// Baseline aggregation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaselineConfig {
    /// Number of most recent snapshots averaged (default 5).
    pub window: usize,
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self { window: 5 }
    }
}

/// Result of a baseline computation.
#[derive(Debug, Clone, PartialEq)]
pub enum BaselineOutcome {
    /// No historical snapshots exist.
    Empty,
    /// Only one snapshot exists; it is the baseline verbatim.
    SingleSample(SnapshotDocument),
    /// Averaged baseline.
    RollingAverage(ResultSnapshot),
}

impl BaselineOutcome {
    /// The baseline snapshot, if one could be produced.
    pub fn snapshot(&self) -> Option<&ResultSnapshot> {
        match self {
            Self::Empty => None,
            Self::SingleSample(doc) => Some(&doc.snapshot),
            Self::RollingAverage(s) => Some(s),
        }
    }

    /// Whether the baseline is a statistical average.
    pub fn is_average(&self) -> bool {
        matches!(self, Self::RollingAverage(_))
    }
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Default)]
struct Accumulator<'a> {
    representative: Option<&'a BenchmarkResult>,
    samples: BTreeMap<Metric, (Vec<f64>, &'a str)>,
}

impl<'a> Accumulator<'a> {
    fn add(&mut self, bench: &'a BenchmarkResult) {
        self.representative.get_or_insert(bench);
        for metric in Metric::ALL {
            if let Some(MetricValue { value, unit }) = bench.metric(metric) {
                self.samples
                    .entry(metric)
                    .or_insert_with(|| (Vec::new(), unit.as_str()))
                    .0
                    .push(*value);
            }
        }
    }

    fn finish(self) -> BenchmarkResult {
        let mut result = BenchmarkResult::default();
        for (metric, (values, unit)) in self.samples {
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            result.set_metric(metric, Some(MetricValue::new(round2(mean), unit)));
        }
        if let Some(sample) = self.representative {
            result.test_vectors = sample.test_vectors.clone();
            result.metadata = sample.metadata.clone();
        }
        result
    }
}

/// Average `snapshots` (newest first) into a single baseline snapshot.
///
/// Benchmarks missing from a snapshot are skipped for that snapshot rather
/// than counted as zero. Units, `test_vectors` and per-benchmark metadata
/// come from the first snapshot that carries them; snapshot metadata comes
/// from the newest snapshot.
pub fn average_snapshots(snapshots: &[ResultSnapshot]) -> ResultSnapshot {
    let mut accumulators: BTreeMap<&str, Accumulator<'_>> = BTreeMap::new();
    for snapshot in snapshots {
        for (name, bench) in &snapshot.benchmarks {
            accumulators.entry(name.as_str()).or_default().add(bench);
        }
    }

    let mut metadata = snapshots
        .first()
        .map(|s| s.metadata.clone())
        .unwrap_or_default();
    metadata.insert(BASELINE_TYPE_KEY.into(), Value::from(ROLLING_AVERAGE));
    metadata.insert(SAMPLE_COUNT_KEY.into(), Value::from(snapshots.len()));

    ResultSnapshot {
        metadata,
        platform: None,
        benchmarks: accumulators
            .into_iter()
            .map(|(name, acc)| (name.to_string(), acc.finish()))
            .collect(),
    }
}

/// Build a baseline from historical documents, newest first.
///
/// Callers pass at most `window` documents; anything beyond the window is
/// ignored here as well.
pub fn compute_baseline(mut history: Vec<SnapshotDocument>, config: &BaselineConfig) -> BaselineOutcome {
    history.truncate(config.window.max(1));
    match history.len() {
        0 => BaselineOutcome::Empty,
        n if n < MIN_BASELINE_SAMPLES => {
            debug!(available = n, "Not enough history to average");
            BaselineOutcome::SingleSample(history.swap_remove(0))
        }
        _ => {
            let snapshots: Vec<ResultSnapshot> = history.into_iter().map(|doc| doc.snapshot).collect();
            BaselineOutcome::RollingAverage(average_snapshots(&snapshots))
        }
    }
}

/// Load the historical window from `dir` and compute the baseline.
pub fn compute_rolling_baseline(
    dir: impl AsRef<Path>,
    config: &BaselineConfig,
) -> io::Result<BaselineOutcome> {
    let dir = dir.as_ref();
    let history = io::load_history(dir, config.window)?;
    info!(
        dir = %dir.display(),
        samples = history.len(),
        window = config.window,
        "Loaded historical results"
    );
    Ok(compute_baseline(history, config))
}

/// Persist a baseline outcome to `path`.
///
/// A single-sample baseline is written from the raw document. Returns
/// `false` without touching the file when there was no history.
pub fn write_baseline(outcome: &BaselineOutcome, path: impl AsRef<Path>) -> io::Result<bool> {
    let path = path.as_ref();
    let benchmarks = match outcome {
        BaselineOutcome::Empty => return Ok(false),
        BaselineOutcome::SingleSample(doc) => {
            io::write_json(&doc.raw, path)?;
            doc.snapshot.benchmarks.len()
        }
        BaselineOutcome::RollingAverage(snapshot) => {
            io::write_snapshot(snapshot, path)?;
            snapshot.benchmarks.len()
        }
    };
    info!(
        path = %path.display(),
        benchmarks,
        averaged = outcome.is_average(),
        "Wrote baseline"
    );
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(value: serde_json::Value) -> ResultSnapshot {
        serde_json::from_value(value).unwrap()
    }

    fn document(value: serde_json::Value) -> SnapshotDocument {
        SnapshotDocument::from_value(value).unwrap()
    }

    fn latency_snapshot(values: &[(&str, f64)]) -> ResultSnapshot {
        let mut benchmarks = BTreeMap::new();
        for (name, value) in values {
            benchmarks.insert(
                name.to_string(),
                BenchmarkResult::default().with_metric(Metric::Latency, *value, "ns"),
            );
        }
        ResultSnapshot::from_benchmarks(benchmarks)
    }

    fn latency_document(values: &[(&str, f64)]) -> SnapshotDocument {
        document(serde_json::to_value(latency_snapshot(values)).unwrap())
    }

    #[test]
    fn test_empty_history() {
        let outcome = compute_baseline(Vec::new(), &BaselineConfig::default());
        assert_eq!(outcome, BaselineOutcome::Empty);
        assert!(outcome.snapshot().is_none());
    }

    #[test]
    fn test_single_sample_is_verbatim() {
        let only = document(json!({
            "metadata": {"commit_sha": "abc"},
            "benchmarks": {"a": {"latency": {"value": 101.23456, "unit": "ns"}}}
        }));

        let outcome = compute_baseline(vec![only.clone()], &BaselineConfig::default());
        assert_eq!(outcome.snapshot(), Some(&only.snapshot));
        assert_eq!(outcome, BaselineOutcome::SingleSample(only));
        assert!(!outcome.is_average());
    }

    #[test]
    fn test_constant_values_average_exactly() {
        let history = vec![latency_document(&[("a", 0.1)]); 3];
        let outcome = compute_baseline(history, &BaselineConfig::default());

        let baseline = outcome.snapshot().unwrap();
        assert!(outcome.is_average());
        assert_eq!(baseline.benchmark("a").unwrap().latency.as_ref().unwrap().value, 0.1);
        assert_eq!(baseline.metadata["sample_count"], json!(3));
        assert_eq!(baseline.metadata["baseline_type"], json!("rolling_average"));
    }

    #[test]
    fn test_absent_benchmarks_are_skipped() {
        let history = vec![
            latency_snapshot(&[("a", 100.0), ("b", 10.0)]),
            latency_snapshot(&[("a", 200.0)]),
            latency_snapshot(&[("a", 300.0), ("b", 20.0)]),
        ];
        let baseline = average_snapshots(&history);

        assert_eq!(baseline.benchmark("a").unwrap().latency.as_ref().unwrap().value, 200.0);
        assert_eq!(baseline.benchmark("b").unwrap().latency.as_ref().unwrap().value, 15.0);
    }

    #[test]
    fn test_mean_is_rounded_and_passthrough_copied() {
        let history = vec![
            snapshot(json!({
                "metadata": {"implementation": "zkx"},
                "benchmarks": {"a": {
                    "throughput": {"value": 1.0, "unit": "Mops/s"},
                    "test_vectors": {"verified": true},
                    "metadata": {"rounds": 8}
                }}
            })),
            snapshot(json!({
                "metadata": {"implementation": "older"},
                "benchmarks": {"a": {
                    "throughput": {"value": 2.0, "unit": "ops/s"},
                    "memory": {"value": 4096.0, "unit": "bytes"},
                    "test_vectors": {"verified": false}
                }}
            })),
            snapshot(json!({
                "benchmarks": {"a": {"throughput": {"value": 2.0, "unit": "ops/s"}}}
            })),
        ];
        let baseline = average_snapshots(&history);
        let a = baseline.benchmark("a").unwrap();

        assert_eq!(a.throughput, Some(MetricValue::new(1.67, "Mops/s")));
        assert_eq!(a.memory, Some(MetricValue::new(4096.0, "bytes")));
        assert!(a.latency.is_none());
        assert!(a.is_verified());
        assert_eq!(a.metadata, Some(json!({"rounds": 8})));
        assert_eq!(baseline.metadata["implementation"], json!("zkx"));
    }

    #[test]
    fn test_window_limits_samples() {
        let history = vec![
            latency_document(&[("a", 10.0)]),
            latency_document(&[("a", 20.0)]),
            latency_document(&[("a", 90.0)]),
        ];
        let outcome = compute_baseline(history, &BaselineConfig { window: 2 });
        let baseline = outcome.snapshot().unwrap();

        assert_eq!(baseline.benchmark("a").unwrap().latency.as_ref().unwrap().value, 15.0);
        assert_eq!(baseline.metadata["sample_count"], json!(2));
    }

    #[test]
    fn test_compute_rolling_baseline_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        for (name, value) in [("20260101T000000.json", 100.0), ("20260102T000000.json", 110.0)] {
            std::fs::write(
                dir.path().join(name),
                json!({"benchmarks": {"a": {"latency": {"value": value, "unit": "ns"}}}}).to_string(),
            )
            .unwrap();
        }

        let outcome = compute_rolling_baseline(dir.path(), &BaselineConfig::default()).unwrap();
        let baseline = outcome.snapshot().unwrap();
        assert_eq!(baseline.benchmark("a").unwrap().latency.as_ref().unwrap().value, 105.0);
    }

    #[test]
    fn test_write_baseline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("baseline.json");

        assert!(!write_baseline(&BaselineOutcome::Empty, &path).unwrap());
        assert!(!path.exists());

        let averaged = average_snapshots(&[latency_snapshot(&[("a", 3.0)]), latency_snapshot(&[("a", 5.0)])]);
        assert!(write_baseline(&BaselineOutcome::RollingAverage(averaged.clone()), &path).unwrap());
        assert_eq!(io::read_snapshot(&path).unwrap(), averaged);
        assert!(std::fs::read_to_string(&path).unwrap().ends_with("}\n"));
    }

    #[test]
    fn test_single_sample_baseline_file_matches_history_file() {
        let dir = tempfile::tempdir().unwrap();
        let raw = json!({
            "metadata": {"commit_sha": "abc"},
            "schema": "v2",
            "benchmarks": {"a": {
                "latency": {"value": 100, "unit": "ns", "stddev": 3.5},
                "iterations": 1000
            }}
        });
        std::fs::write(dir.path().join("20260101T000000.json"), raw.to_string()).unwrap();

        let outcome = compute_rolling_baseline(dir.path(), &BaselineConfig::default()).unwrap();
        assert!(matches!(outcome, BaselineOutcome::SingleSample(_)));

        let path = dir.path().join(io::BASELINE_FILE);
        assert!(write_baseline(&outcome, &path).unwrap());
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, raw);
    }
}
