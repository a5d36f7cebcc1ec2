// Copyright 2026 Benchwatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! Per-implementation history documents.
//!
//! A history document lists every recorded commit of one implementation,
//! newest first, with at most one entry per commit SHA. Fields this crate
//! does not know about are kept so other writers' data survives a rewrite.

use benchwatch_benchmarks::{Metric, MetricValue, RawPlatform, ResultSnapshot};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

/// Document type recorded for implementations benchmarked on every push.
pub const TRACKED: &str = "tracked";

/// Length of the abbreviated commit SHA.
pub const SHORT_SHA_LEN: usize = 7;

/// Errors building a commit entry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EntryError {
    /// The commit SHA is empty.
    #[error("Commit SHA is required")]
    MissingSha,
}

/// Normalized platform of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    /// Operating system.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    /// CPU model or vendor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,
    /// GPU model or vendor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu: Option<String>,
}

impl From<RawPlatform> for Platform {
    fn from(raw: RawPlatform) -> Self {
        let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());
        Self {
            os: raw.os,
            cpu: non_empty(raw.cpu).or_else(|| non_empty(raw.cpu_vendor)),
            gpu: non_empty(raw.gpu).or_else(|| non_empty(raw.gpu_vendor)),
        }
    }
}

/// Benchmark measurements as stored in history: metrics only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordedBenchmark {
    /// Latency measurement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<MetricValue>,
    /// Throughput measurement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub throughput: Option<MetricValue>,
    /// Memory measurement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<MetricValue>,
}

/// Strip everything but the metrics from a snapshot's benchmarks.
pub fn normalize_benchmarks(snapshot: &ResultSnapshot) -> BTreeMap<String, RecordedBenchmark> {
    snapshot
        .benchmarks
        .iter()
        .map(|(name, bench)| {
            let recorded = RecordedBenchmark {
                latency: bench.metric(Metric::Latency).cloned(),
                throughput: bench.metric(Metric::Throughput).cloned(),
                memory: bench.metric(Metric::Memory).cloned(),
            };
            (name.clone(), recorded)
        })
        .collect()
}

/// One recorded commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitEntry {
    /// Full commit SHA; unique within a history document.
    pub sha: String,
    /// Abbreviated SHA.
    pub short_sha: String,
    /// Commit subject.
    #[serde(default)]
    pub message: String,
    /// Recording time, ISO-8601 UTC.
    pub timestamp: String,
    /// Platform the benchmarks ran on.
    #[serde(default)]
    pub platform: Platform,
    /// Measurements keyed by benchmark name.
    #[serde(default)]
    pub benchmarks: BTreeMap<String, RecordedBenchmark>,
    /// Link to the CI run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_url: Option<String>,
    /// Fields written by other tools.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CommitEntry {
    /// Build an entry for `sha` from a result snapshot.
    pub fn from_snapshot(
        snapshot: &ResultSnapshot,
        sha: &str,
        message: impl Into<String>,
        timestamp: impl Into<String>,
        run_url: Option<String>,
    ) -> Result<Self, EntryError> {
        let sha = sha.trim();
        if sha.is_empty() {
            return Err(EntryError::MissingSha);
        }

        Ok(Self {
            sha: sha.to_string(),
            short_sha: sha.chars().take(SHORT_SHA_LEN).collect(),
            message: message.into(),
            timestamp: timestamp.into(),
            platform: snapshot.raw_platform().map(Platform::from).unwrap_or_default(),
            benchmarks: normalize_benchmarks(snapshot),
            run_url: run_url.filter(|url| !url.is_empty()),
            extra: Map::new(),
        })
    }
}

/// Whether a merge added a commit or replaced an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The commit was new and prepended.
    Inserted,
    /// An entry with the same SHA was replaced in place.
    Replaced,
}

/// History of one implementation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryDocument {
    /// Implementation name.
    pub implementation: String,
    /// Implementation type.
    #[serde(rename = "type", default = "tracked")]
    pub kind: String,
    /// Commits, newest first.
    #[serde(default)]
    pub commits: Vec<CommitEntry>,
    /// Fields written by other tools.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn tracked() -> String {
    TRACKED.to_string()
}

impl HistoryDocument {
    /// Empty history for an implementation that has never been recorded.
    pub fn empty(implementation: impl Into<String>) -> Self {
        Self {
            implementation: implementation.into(),
            kind: tracked(),
            commits: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Insert `entry`, replacing any entry with the same SHA.
    ///
    /// A replaced entry keeps its position; duplicates of the SHA further
    /// down the list are dropped.
    pub fn upsert(&mut self, entry: CommitEntry) -> MergeOutcome {
        match self.commits.iter().position(|c| c.sha == entry.sha) {
            Some(index) => {
                let sha = entry.sha.clone();
                self.commits[index] = entry;
                let mut seen = false;
                self.commits.retain(|c| {
                    if c.sha != sha {
                        return true;
                    }
                    let keep = !seen;
                    seen = true;
                    keep
                });
                MergeOutcome::Replaced
            }
            None => {
                self.commits.insert(0, entry);
                MergeOutcome::Inserted
            }
        }
    }

    /// Number of recorded commits.
    pub fn commit_count(&self) -> usize {
        self.commits.len()
    }
}

/// Merge a commit into the current remote history.
///
/// Pure: depends only on `current` and `entry`, so it can be re-applied to
/// a newer remote state after a write conflict.
pub fn merge_commit(
    current: Option<HistoryDocument>,
    implementation: &str,
    entry: &CommitEntry,
) -> (HistoryDocument, MergeOutcome) {
    let mut document = current.unwrap_or_else(|| HistoryDocument::empty(implementation));
    let outcome = document.upsert(entry.clone());
    (document, outcome)
}
