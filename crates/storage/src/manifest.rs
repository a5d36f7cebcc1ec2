// Copyright 2026 Benchwatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! The shared manifest of tracked implementations.

use crate::history::TRACKED;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Summary of one implementation in the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImplementationEntry {
    /// Implementation name; unique within the manifest.
    pub name: String,
    /// Implementation type.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Number of commits in the implementation's history.
    #[serde(default)]
    pub commit_count: usize,
    /// Short SHA of the most recently recorded commit.
    #[serde(default)]
    pub latest_commit: String,
    /// Source repository, when it differs from the implementation name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    /// Free-form tags such as `gpu` or `cuda`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Fields written by other tools.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Index of every tracked implementation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestDocument {
    /// Implementations keyed by name.
    #[serde(default)]
    pub implementations: Vec<ImplementationEntry>,
    /// Time of the last update, ISO-8601 UTC.
    #[serde(default)]
    pub last_updated: String,
    /// Fields written by other tools.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ManifestDocument {
    /// Empty manifest.
    pub fn empty(timestamp: impl Into<String>) -> Self {
        Self {
            implementations: Vec::new(),
            last_updated: timestamp.into(),
            extra: Map::new(),
        }
    }

    /// Look up an implementation.
    pub fn implementation(&self, name: &str) -> Option<&ImplementationEntry> {
        self.implementations.iter().find(|i| i.name == name)
    }
}

/// What a run reports about its implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplementationUpdate {
    /// Implementation name.
    pub name: String,
    /// Commit count of the history document this run wrote.
    pub commit_count: usize,
    /// Short SHA of the recorded commit.
    pub latest_commit: String,
    /// Source repository name; ignored when empty or equal to `name`.
    pub repo: Option<String>,
    /// Tags; ignored when empty.
    pub tags: Vec<String>,
}

impl ImplementationUpdate {
    fn effective_repo(&self) -> Option<String> {
        self.repo
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty() && *r != self.name)
            .map(str::to_string)
    }

    fn effective_tags(&self) -> Option<Vec<String>> {
        let tags: Vec<String> = self
            .tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        (!tags.is_empty()).then_some(tags)
    }
}

/// Merge an implementation update into the current remote manifest.
///
/// Only the matching entry's `commitCount`, `latestCommit`, `repo` and `tags`
/// change, plus `lastUpdated`. `commitCount` always takes the length of the
/// history document this run wrote, even when the remote value is larger.
pub fn merge_implementation(
    current: Option<ManifestDocument>,
    update: &ImplementationUpdate,
    timestamp: &str,
) -> ManifestDocument {
    let mut manifest = current.unwrap_or_else(|| ManifestDocument::empty(timestamp));
    let repo = update.effective_repo();
    let tags = update.effective_tags();

    match manifest
        .implementations
        .iter_mut()
        .find(|i| i.name == update.name)
    {
        Some(entry) => {
            entry.commit_count = update.commit_count;
            entry.latest_commit = update.latest_commit.clone();
            if repo.is_some() {
                entry.repo = repo;
            }
            if tags.is_some() {
                entry.tags = tags;
            }
        }
        None => manifest.implementations.push(ImplementationEntry {
            name: update.name.clone(),
            kind: TRACKED.to_string(),
            commit_count: update.commit_count,
            latest_commit: update.latest_commit.clone(),
            repo,
            tags,
            extra: Map::new(),
        }),
    }

    manifest.last_updated = timestamp.to_string();
    manifest
}
