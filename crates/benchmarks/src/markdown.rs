//! Markdown output generation for benchmark results.
//!
//! This module renders the step summary shown on a CI run page, and the
//! list of flagged changes produced by regression detection.

use crate::regression::RegressionReport;
use crate::result::{MetricValue, ResultSnapshot};
use std::fmt::Write;

fn format_value(value: Option<&MetricValue>, decimals: usize) -> String {
    value
        .map(|v| format!("{:.*}", decimals, v.value))
        .unwrap_or_else(|| "N/A".to_string())
}

/// Generate the step summary table for a result snapshot.
pub fn generate_summary(snapshot: &ResultSnapshot) -> String {
    let mut output = String::new();

    writeln!(output, "## Benchmark Results").unwrap();
    writeln!(output).unwrap();
    writeln!(output, "| Benchmark | Latency (ns) | Throughput (ops/s) | Verified |").unwrap();
    writeln!(output, "|-----------|--------------|--------------------|---------:|").unwrap();

    for (name, bench) in &snapshot.benchmarks {
        writeln!(
            output,
            "| {} | {} | {} | {} |",
            name,
            format_value(bench.latency.as_ref(), 2),
            format_value(bench.throughput.as_ref(), 0),
            if bench.is_verified() { "Yes" } else { "No" }
        )
        .unwrap();
    }

    output
}

/// Generate a section listing flagged changes from regression detection.
pub fn generate_change_report(report: &RegressionReport) -> String {
    let mut output = String::new();

    writeln!(output, "## Performance Changes").unwrap();
    writeln!(output).unwrap();
    writeln!(
        output,
        "Classification: **{}** (threshold {:.0}%)",
        report.classification,
        report.threshold * 100.0
    )
    .unwrap();
    writeln!(output).unwrap();

    let mut any = false;
    for change in report.flagged() {
        any = true;
        writeln!(output, "- {}", change.message()).unwrap();
    }
    if !any {
        writeln!(output, "No significant changes.").unwrap();
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regression::{detect, RegressionConfig};
    use serde_json::json;

    #[test]
    fn test_summary_rows() {
        let snapshot: ResultSnapshot = serde_json::from_value(json!({
            "benchmarks": {
                "hash": {
                    "latency": {"value": 1520.456, "unit": "ns"},
                    "throughput": {"value": 657680.7, "unit": "ops/s"},
                    "test_vectors": {"verified": true}
                },
                "msm": {"memory": {"value": 10.0, "unit": "bytes"}}
            }
        }))
        .unwrap();

        let summary = generate_summary(&snapshot);
        assert!(summary.contains("| hash | 1520.46 | 657681 | Yes |"));
        assert!(summary.contains("| msm | N/A | N/A | No |"));
    }

    #[test]
    fn test_change_report_lists_flagged() {
        let current: ResultSnapshot = serde_json::from_value(json!({
            "benchmarks": {"a": {"latency": {"value": 120.0, "unit": "ns"}}}
        }))
        .unwrap();
        let baseline: ResultSnapshot = serde_json::from_value(json!({
            "benchmarks": {"a": {"latency": {"value": 100.0, "unit": "ns"}}}
        }))
        .unwrap();

        let report = detect(&current, &baseline, &RegressionConfig::default());
        let text = generate_change_report(&report);
        assert!(text.contains("Classification: **regression** (threshold 10%)"));
        assert!(text.contains("- Regression in a latency: 20.0% slower"));

        let quiet = detect(&baseline, &baseline, &RegressionConfig::default());
        assert!(generate_change_report(&quiet).contains("No significant changes."));
    }
}
