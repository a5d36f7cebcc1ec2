// Copyright 2026 Benchwatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! Test-vector verification of a result snapshot.

use benchwatch_benchmarks::ResultSnapshot;
use serde::Serialize;
use std::collections::BTreeMap;

/// Per-benchmark verification status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    /// Benchmark name to verified flag
    pub benchmarks: BTreeMap<String, bool>,
}

impl VerificationReport {
    /// Names of benchmarks whose test vectors did not verify.
    pub fn failed(&self) -> Vec<&str> {
        self.benchmarks
            .iter()
            .filter(|(_, verified)| !**verified)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// True when every benchmark verified.
    pub fn passed(&self) -> bool {
        self.benchmarks.values().all(|verified| *verified)
    }

    /// One-line outcome for the console.
    pub fn summary(&self) -> String {
        if self.passed() {
            "All test vectors verified".to_string()
        } else {
            format!(
                "Test vector verification failed for: {}",
                self.failed().join(", ")
            )
        }
    }
}

/// Check test vectors for every benchmark in a snapshot.
///
/// A benchmark without a `test_vectors` record counts as unverified.
pub fn verify(snapshot: &ResultSnapshot) -> VerificationReport {
    let benchmarks = snapshot
        .benchmarks
        .iter()
        .map(|(name, result)| (name.clone(), result.is_verified()))
        .collect();
    VerificationReport { benchmarks }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(value: serde_json::Value) -> ResultSnapshot {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_all_verified() {
        let report = verify(&snapshot(json!({"benchmarks": {
            "ntt": {"test_vectors": {"verified": true}},
            "msm": {"test_vectors": {"verified": true}}
        }})));
        assert!(report.passed());
        assert_eq!(report.summary(), "All test vectors verified");
    }

    #[test]
    fn test_missing_and_false_fail() {
        let report = verify(&snapshot(json!({"benchmarks": {
            "ntt": {"test_vectors": {"verified": true}},
            "msm": {"test_vectors": {"verified": false}},
            "poseidon": {}
        }})));
        assert!(!report.passed());
        assert_eq!(report.failed(), vec!["msm", "poseidon"]);
        assert_eq!(
            report.summary(),
            "Test vector verification failed for: msm, poseidon"
        );
    }

    #[test]
    fn test_empty_snapshot_passes() {
        assert!(verify(&snapshot(json!({"benchmarks": {}}))).passed());
    }
}
