// Copyright 2026 Benchwatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! History synchronization.
//!
//! Records a commit into the implementation's history document, then
//! reflects the new commit count into the shared manifest. Each document
//! goes through a read, merge, conditional-write cycle; on a version
//! conflict the whole cycle restarts from a fresh read, up to
//! [`SyncConfig::max_attempts`] times.
//!
//! History is always written before the manifest, so an interrupted run
//! can leave the manifest behind the history but never ahead of it.

use crate::history::{merge_commit, CommitEntry, HistoryDocument, MergeOutcome};
use crate::manifest::{merge_implementation, ImplementationUpdate, ManifestDocument};
use crate::store::{DocumentStore, DocumentWrite, StoreError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that abort a synchronization.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Every attempt hit a version conflict.
    #[error("Gave up on {path} after {attempts} conflicting write attempts")]
    RetriesExhausted {
        /// Document path.
        path: String,
        /// Attempts made.
        attempts: u32,
    },

    /// The store failed for a reason other than a conflict.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A remote document could not be parsed; it is left untouched.
    #[error("Remote document {path} is not valid: {source}")]
    InvalidDocument {
        /// Document path.
        path: String,
        /// Parse error.
        #[source]
        source: serde_json::Error,
    },

    /// A merged document could not be serialized.
    #[error("Failed to serialize {path}: {source}")]
    Serialize {
        /// Document path.
        path: String,
        /// Serialization error.
        #[source]
        source: serde_json::Error,
    },

    /// The implementation name cannot be used as a path segment.
    #[error("Invalid implementation name: {0:?}")]
    InvalidImplementation(String),
}

/// Result type for synchronization.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Retry and layout settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Write attempts per document before giving up (default 3).
    pub max_attempts: u32,
    /// Delay between attempts in milliseconds (default 2000).
    pub retry_delay_ms: u64,
    /// Directory holding the documents inside the store (default `data`).
    pub data_root: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay_ms: 2000,
            data_root: "data".to_string(),
        }
    }
}

impl SyncConfig {
    /// Delay between attempts.
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Path of an implementation's history document.
    pub fn history_path(&self, implementation: &str) -> String {
        format!("{}/{}/history.json", self.data_root.trim_end_matches('/'), implementation)
    }

    /// Path of the manifest document.
    pub fn manifest_path(&self) -> String {
        format!("{}/manifest.json", self.data_root.trim_end_matches('/'))
    }
}

/// Everything needed to record one run.
#[derive(Debug, Clone)]
pub struct SyncRequest {
    /// Implementation name.
    pub implementation: String,
    /// Commit to record.
    pub entry: CommitEntry,
    /// Source repository name for the manifest.
    pub repo: Option<String>,
    /// Tags for the manifest.
    pub tags: Vec<String>,
    /// Time of the update, ISO-8601 UTC.
    pub timestamp: String,
}

/// Result of a successful synchronization.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    /// Whether the commit was new or replaced an earlier push.
    pub outcome: MergeOutcome,
    /// Commits in the written history document.
    pub commit_count: usize,
    /// Path of the history document.
    pub history_path: String,
    /// Path of the manifest document.
    pub manifest_path: String,
}

fn validate_implementation(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.chars().any(char::is_control);
    if valid {
        Ok(())
    } else {
        Err(SyncError::InvalidImplementation(name.to_string()))
    }
}

/// Writes history and manifest documents through a [`DocumentStore`].
pub struct HistorySynchronizer<S> {
    store: S,
    config: SyncConfig,
}

impl<S: DocumentStore> HistorySynchronizer<S> {
    /// Create a synchronizer.
    pub fn new(store: S, config: SyncConfig) -> Self {
        Self { store, config }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Record `request.entry` in history, then update the manifest.
    pub async fn synchronize(&self, request: &SyncRequest) -> Result<SyncReport> {
        validate_implementation(&request.implementation)?;
        let implementation = request.implementation.as_str();
        let entry = &request.entry;

        let history_path = self.config.history_path(implementation);
        let history_message = format!(
            "chore: update {} benchmark data ({})",
            implementation, entry.short_sha
        );
        let (history, outcome): (HistoryDocument, MergeOutcome) = self
            .read_modify_write(&history_path, &history_message, |current| {
                merge_commit(current, implementation, entry)
            })
            .await?;
        if outcome == MergeOutcome::Replaced {
            info!(implementation, sha = %entry.short_sha, "Commit already recorded, entry updated");
        }
        info!(
            implementation,
            commits = history.commit_count(),
            path = %history_path,
            "Pushed history"
        );

        let update = ImplementationUpdate {
            name: implementation.to_string(),
            commit_count: history.commit_count(),
            latest_commit: entry.short_sha.clone(),
            repo: request.repo.clone(),
            tags: request.tags.clone(),
        };
        let manifest_path = self.config.manifest_path();
        let manifest_message = format!("chore: update manifest for {}", implementation);
        let _: (ManifestDocument, ()) = self
            .read_modify_write(&manifest_path, &manifest_message, |current| {
                (merge_implementation(current, &update, &request.timestamp), ())
            })
            .await?;
        info!(implementation, path = %manifest_path, "Updated manifest");

        Ok(SyncReport {
            outcome,
            commit_count: history.commit_count(),
            history_path,
            manifest_path,
        })
    }

    /// Read, merge and conditionally write one document, retrying on conflict.
    ///
    /// `merge` receives the freshly read remote state on every attempt and
    /// never sees the result of an earlier, rejected attempt.
    async fn read_modify_write<T, O, F>(&self, path: &str, message: &str, mut merge: F) -> Result<(T, O)>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut(Option<T>) -> (T, O),
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let (current, version) = match self.store.get(path).await? {
                Some(doc) => {
                    let parsed = serde_json::from_str(&doc.content).map_err(|source| {
                        SyncError::InvalidDocument {
                            path: path.to_string(),
                            source,
                        }
                    })?;
                    (Some(parsed), Some(doc.version))
                }
                None => {
                    debug!(path, "Document absent, starting empty");
                    (None, None)
                }
            };

            let (merged, outcome) = merge(current);
            let content = serde_json::to_string_pretty(&merged).map_err(|source| SyncError::Serialize {
                path: path.to_string(),
                source,
            })?;
            let write = DocumentWrite {
                content,
                message: message.to_string(),
                version,
            };

            match self.store.put(path, write).await {
                Ok(()) => {
                    debug!(path, attempt, "Conditional write accepted");
                    return Ok((merged, outcome));
                }
                Err(err) if err.is_conflict() => {
                    if attempt >= max_attempts {
                        return Err(SyncError::RetriesExhausted {
                            path: path.to_string(),
                            attempts: attempt,
                        });
                    }
                    warn!(path, attempt, max_attempts, "Write conflict, re-reading and retrying");
                    tokio::time::sleep(self.config.retry_delay()).await;
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}
