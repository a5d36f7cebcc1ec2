//! Regression and improvement classification against a baseline.
//!
//! Every metric present in both the current run and the baseline is
//! compared by relative change. The run as a whole is then classified as
//! a regression, an improvement, a mix of both, or neither.

use crate::result::{BenchmarkResult, Direction, Metric, ResultSnapshot};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegressionConfig {
    /// Relative change that counts as significant, as a fraction (default 0.10).
    pub threshold: f64,
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self { threshold: 0.10 }
    }
}

/// Classification of a single metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// The metric got worse beyond the threshold.
    Regression,
    /// The metric got better beyond the threshold.
    Improvement,
    /// Within the threshold.
    None,
}

/// Classification of a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunClassification {
    /// No significant change.
    #[default]
    None,
    /// At least one regression and no improvement.
    Regression,
    /// At least one improvement and no regression.
    Improvement,
    /// Both regressions and improvements.
    Mixed,
}

impl RunClassification {
    /// Aggregate from whether any regression and any improvement was seen.
    pub fn from_flags(any_regression: bool, any_improvement: bool) -> Self {
        match (any_regression, any_improvement) {
            (true, true) => Self::Mixed,
            (true, false) => Self::Regression,
            (false, true) => Self::Improvement,
            (false, false) => Self::None,
        }
    }

    /// Whether anything significant happened.
    pub fn is_significant(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Value written to the `change_type` step output; empty for no change.
    pub fn as_output_value(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::Regression => "regression",
            Self::Improvement => "improvement",
            Self::Mixed => "mixed",
        }
    }
}

impl fmt::Display for RunClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            other => f.write_str(other.as_output_value()),
        }
    }
}

/// Classify a relative change for a metric with the given direction.
///
/// Comparisons are strict: a change of exactly `threshold` is not flagged.
pub fn classify_change(change: f64, threshold: f64, direction: Direction) -> ChangeKind {
    let (worse, better) = match direction {
        Direction::IncreaseIsRegression => (change > threshold, change < -threshold),
        Direction::DecreaseIsRegression => (change < -threshold, change > threshold),
    };
    if worse {
        ChangeKind::Regression
    } else if better {
        ChangeKind::Improvement
    } else {
        ChangeKind::None
    }
}

/// A compared metric of one benchmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricChange {
    /// Benchmark name.
    pub benchmark: String,
    /// Metric compared.
    pub metric: Metric,
    /// Baseline value.
    pub baseline: f64,
    /// Current value.
    pub current: f64,
    /// Relative change `(current - baseline) / baseline`.
    pub change: f64,
    /// Classification.
    pub kind: ChangeKind,
}

impl MetricChange {
    /// Magnitude of the change in percent.
    pub fn percent(&self) -> f64 {
        self.change.abs() * 100.0
    }

    /// One-line human readable description, e.g.
    /// `Regression in hash latency: 15.0% slower`.
    pub fn message(&self) -> String {
        let (prefix, label) = match self.kind {
            ChangeKind::Regression => ("Regression", self.metric.regression_label()),
            ChangeKind::Improvement => ("Improvement", self.metric.improvement_label()),
            ChangeKind::None => ("No change", "within threshold"),
        };
        format!(
            "{} in {} {}: {:.1}% {}",
            prefix,
            self.benchmark,
            self.metric,
            self.percent(),
            label
        )
    }
}

/// Compare one metric of a benchmark. `None` means the metric gives no signal.
pub fn compare_metric(
    name: &str,
    metric: Metric,
    current: &BenchmarkResult,
    baseline: &BenchmarkResult,
    threshold: f64,
) -> Option<MetricChange> {
    let curr = current.metric(metric)?.value;
    let base = baseline.metric(metric)?.value;
    if base <= 0.0 || curr <= 0.0 {
        return None;
    }

    let change = (curr - base) / base;
    Some(MetricChange {
        benchmark: name.to_string(),
        metric,
        baseline: base,
        current: curr,
        change,
        kind: classify_change(change, threshold, metric.direction()),
    })
}

/// Full classification of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionReport {
    /// Threshold used.
    pub threshold: f64,
    /// Every compared metric, flagged or not.
    pub changes: Vec<MetricChange>,
    /// Run-level classification.
    pub classification: RunClassification,
}

impl RegressionReport {
    /// Compared metrics classified as regression or improvement.
    pub fn flagged(&self) -> impl Iterator<Item = &MetricChange> {
        self.changes.iter().filter(|c| c.kind != ChangeKind::None)
    }

    /// Messages for every flagged metric.
    pub fn messages(&self) -> Vec<String> {
        self.flagged().map(MetricChange::message).collect()
    }

    /// Whether any metric regressed.
    pub fn has_regression(&self) -> bool {
        self.changes.iter().any(|c| c.kind == ChangeKind::Regression)
    }
}

/// Classify `current` against `baseline`.
///
/// Benchmarks absent from the baseline are skipped entirely.
pub fn detect(
    current: &ResultSnapshot,
    baseline: &ResultSnapshot,
    config: &RegressionConfig,
) -> RegressionReport {
    let changes: Vec<MetricChange> = current
        .benchmarks
        .iter()
        .filter_map(|(name, curr)| baseline.benchmark(name).map(|base| (name, curr, base)))
        .flat_map(|(name, curr, base)| {
            Metric::ALL
                .into_iter()
                .filter_map(move |metric| compare_metric(name, metric, curr, base, config.threshold))
        })
        .collect();

    let any_regression = changes.iter().any(|c| c.kind == ChangeKind::Regression);
    let any_improvement = changes.iter().any(|c| c.kind == ChangeKind::Improvement);

    RegressionReport {
        threshold: config.threshold,
        classification: RunClassification::from_flags(any_regression, any_improvement),
        changes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn snapshot(benches: &[(&str, Metric, f64)]) -> ResultSnapshot {
        let mut benchmarks: BTreeMap<String, BenchmarkResult> = BTreeMap::new();
        for (name, metric, value) in benches {
            let entry = benchmarks.entry(name.to_string()).or_default();
            entry.set_metric(*metric, Some(crate::MetricValue::new(*value, "u")));
        }
        ResultSnapshot::from_benchmarks(benchmarks)
    }

    fn classify(metric: Metric, base: f64, curr: f64) -> RegressionReport {
        classify_with(metric, base, curr, RegressionConfig::default().threshold)
    }

    fn classify_with(metric: Metric, base: f64, curr: f64, threshold: f64) -> RegressionReport {
        detect(
            &snapshot(&[("bench_a", metric, curr)]),
            &snapshot(&[("bench_a", metric, base)]),
            &RegressionConfig { threshold },
        )
    }

    #[test]
    fn test_latency_examples() {
        let report = classify(Metric::Latency, 100.0, 115.0);
        assert_eq!(report.classification, RunClassification::Regression);
        assert_eq!(report.messages(), vec!["Regression in bench_a latency: 15.0% slower"]);

        let report = classify(Metric::Latency, 100.0, 89.0);
        assert_eq!(report.classification, RunClassification::Improvement);
        assert_eq!(report.messages(), vec!["Improvement in bench_a latency: 11.0% faster"]);

        let report = classify(Metric::Latency, 100.0, 105.0);
        assert_eq!(report.classification, RunClassification::None);
        assert!(report.messages().is_empty());
        assert_eq!(report.changes.len(), 1);
    }

    #[test]
    fn test_throughput_drop_is_regression() {
        let report = classify(Metric::Throughput, 1000.0, 850.0);
        assert_eq!(report.classification, RunClassification::Regression);
        assert_eq!(report.messages(), vec!["Regression in bench_a throughput: 15.0% lower"]);

        let report = classify(Metric::Throughput, 1000.0, 1200.0);
        assert_eq!(report.classification, RunClassification::Improvement);
    }

    #[test]
    fn test_memory_growth_is_regression() {
        let report = classify(Metric::Memory, 1000.0, 1500.0);
        assert_eq!(report.messages(), vec!["Regression in bench_a memory: 50.0% more"]);
    }

    #[test]
    fn test_threshold_boundaries_are_strict() {
        let t = 0.10;
        let eps = 1e-6;
        let cases = [
            (0.10, Direction::IncreaseIsRegression, ChangeKind::None),
            (0.10 + eps, Direction::IncreaseIsRegression, ChangeKind::Regression),
            (0.10 - eps, Direction::IncreaseIsRegression, ChangeKind::None),
            (-0.10, Direction::IncreaseIsRegression, ChangeKind::None),
            (-0.10 - eps, Direction::IncreaseIsRegression, ChangeKind::Improvement),
            (0.10, Direction::DecreaseIsRegression, ChangeKind::None),
            (0.10 + eps, Direction::DecreaseIsRegression, ChangeKind::Improvement),
            (-0.10, Direction::DecreaseIsRegression, ChangeKind::None),
            (-0.10 - eps, Direction::DecreaseIsRegression, ChangeKind::Regression),
            (-0.10 + eps, Direction::DecreaseIsRegression, ChangeKind::None),
        ];
        for (change, direction, expected) in cases {
            assert_eq!(
                classify_change(change, t, direction),
                expected,
                "change {change} {direction:?}"
            );
        }
    }

    #[test]
    fn test_exact_ratio_at_threshold_is_none() {
        assert_eq!(classify(Metric::Latency, 100.0, 110.0).classification, RunClassification::None);
        assert_eq!(classify(Metric::Latency, 100.0, 90.0).classification, RunClassification::None);
        assert_eq!(
            classify(Metric::Latency, 100.0, 110.01).classification,
            RunClassification::Regression
        );
    }

    #[test]
    fn test_ratio_boundaries_for_other_thresholds() {
        use RunClassification as R;

        // (threshold, current over a baseline of 100, latency, throughput)
        let cases = [
            (0.05, 105.0, R::None, R::None),
            (0.05, 95.0, R::None, R::None),
            (0.05, 105.01, R::Regression, R::Improvement),
            (0.05, 104.99, R::None, R::None),
            (0.05, 94.99, R::Improvement, R::Regression),
            (0.05, 95.01, R::None, R::None),
            (0.25, 125.0, R::None, R::None),
            (0.25, 75.0, R::None, R::None),
            (0.25, 125.01, R::Regression, R::Improvement),
            (0.25, 124.99, R::None, R::None),
            (0.25, 74.99, R::Improvement, R::Regression),
            (0.25, 75.01, R::None, R::None),
        ];
        for (t, curr, latency, throughput) in cases {
            assert_eq!(
                classify_with(Metric::Latency, 100.0, curr, t).classification,
                latency,
                "latency {curr} at {t}"
            );
            assert_eq!(
                classify_with(Metric::Throughput, 100.0, curr, t).classification,
                throughput,
                "throughput {curr} at {t}"
            );
        }
    }

    #[test]
    fn test_non_positive_values_are_skipped() {
        assert!(classify(Metric::Latency, 0.0, 500.0).changes.is_empty());
        assert!(classify(Metric::Latency, 100.0, 0.0).changes.is_empty());
        assert!(classify(Metric::Throughput, -5.0, 10.0).changes.is_empty());
    }

    #[test]
    fn test_missing_benchmark_or_metric_is_skipped() {
        let current = snapshot(&[
            ("new", Metric::Latency, 999.0),
            ("old", Metric::Latency, 100.0),
            ("old", Metric::Memory, 10.0),
        ]);
        let baseline = snapshot(&[("old", Metric::Latency, 100.0)]);

        let report = detect(&current, &baseline, &RegressionConfig::default());
        assert_eq!(report.changes.len(), 1);
        assert_eq!(report.changes[0].benchmark, "old");
        assert_eq!(report.classification, RunClassification::None);
    }

    #[test]
    fn test_mixed_across_benchmarks() {
        let current = snapshot(&[("a", Metric::Latency, 150.0), ("b", Metric::Throughput, 150.0)]);
        let baseline = snapshot(&[("a", Metric::Latency, 100.0), ("b", Metric::Throughput, 100.0)]);

        let report = detect(&current, &baseline, &RegressionConfig::default());
        assert_eq!(report.classification, RunClassification::Mixed);
        assert!(report.has_regression());
        assert_eq!(report.flagged().count(), 2);
    }

    #[test]
    fn test_output_values() {
        assert_eq!(RunClassification::None.as_output_value(), "");
        assert_eq!(RunClassification::Mixed.as_output_value(), "mixed");
        assert_eq!(RunClassification::None.to_string(), "none");
        assert!(!RunClassification::None.is_significant());
    }
}
