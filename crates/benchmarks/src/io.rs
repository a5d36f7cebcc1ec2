//! I/O operations for benchmark snapshots.
//!
//! This module reads and writes result and baseline snapshots and selects
//! the historical corpus a rolling baseline is built from.

use crate::result::ResultSnapshot;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::debug;

/// Default directory holding historical snapshots and the baseline.
pub const RESULTS_DIR: &str = "benchmark_data";

/// Default result file of the current run.
pub const RESULTS_FILE: &str = "benchmark_results.json";

/// File name of the baseline inside the results directory.
pub const BASELINE_FILE: &str = "baseline.json";

/// Errors raised while reading or writing snapshots.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The file could not be read or written.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The file is not a valid snapshot.
    #[error("Malformed snapshot {path}: {source}")]
    Malformed {
        /// File involved.
        path: PathBuf,
        /// Parse error.
        #[source]
        source: serde_json::Error,
    },

    /// The snapshot could not be serialized.
    #[error("Failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type for snapshot I/O.
pub type Result<T> = std::result::Result<T, SnapshotError>;

fn io_error(path: &Path, source: io::Error) -> SnapshotError {
    SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// A parsed snapshot together with the JSON document it was read from.
///
/// The typed view only knows the fields the pipeline uses; `raw` keeps
/// everything else a harness wrote, number formatting included.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotDocument {
    /// Typed view of the document.
    pub snapshot: ResultSnapshot,
    /// The document as read.
    pub raw: Value,
}

impl SnapshotDocument {
    /// Parse a document, keeping the original value.
    pub fn from_value(raw: Value) -> serde_json::Result<Self> {
        let snapshot = ResultSnapshot::deserialize(&raw)?;
        Ok(Self { snapshot, raw })
    }
}

fn malformed(path: &Path, source: serde_json::Error) -> SnapshotError {
    SnapshotError::Malformed {
        path: path.to_path_buf(),
        source,
    }
}

/// Read a snapshot. Any parse failure is fatal.
pub fn read_snapshot(path: impl AsRef<Path>) -> Result<ResultSnapshot> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| io_error(path, e))?;
    serde_json::from_str(&content).map_err(|e| malformed(path, e))
}

/// Read a snapshot and keep the raw document alongside it.
pub fn read_snapshot_document(path: impl AsRef<Path>) -> Result<SnapshotDocument> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| io_error(path, e))?;
    let raw: Value = serde_json::from_str(&content).map_err(|e| malformed(path, e))?;
    SnapshotDocument::from_value(raw).map_err(|e| malformed(path, e))
}

/// Read a snapshot that may legitimately not exist yet, such as the baseline.
pub fn read_optional_snapshot(path: impl AsRef<Path>) -> Result<Option<ResultSnapshot>> {
    let path = path.as_ref();
    if !path.exists() {
        debug!(path = %path.display(), "Snapshot not present");
        return Ok(None);
    }
    read_snapshot(path).map(Some)
}

/// Write a snapshot as pretty JSON with a trailing newline.
pub fn write_snapshot(snapshot: &ResultSnapshot, path: impl AsRef<Path>) -> Result<()> {
    write_json(snapshot, path)
}

/// Write any serializable document as pretty JSON with a trailing newline.
pub fn write_json<T: Serialize + ?Sized>(document: &T, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut json = serde_json::to_string_pretty(document)?;
    json.push('\n');
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
    }
    fs::write(path, json).map_err(|e| io_error(path, e))
}

fn history_file_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{8}T\d{6}\.json$").expect("static regex is valid"))
}

/// Whether `name` is a timestamp-named historical snapshot (`YYYYMMDDTHHMMSS.json`).
pub fn is_history_file_name(name: &str) -> bool {
    history_file_pattern().is_match(name)
}

/// List historical snapshot files, newest first.
///
/// File names sort lexicographically in time order, so descending name
/// order is descending time order. A missing directory yields no files.
pub fn list_history_files(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| io_error(dir, e))? {
        let entry = entry.map_err(|e| io_error(dir, e))?;
        let path = entry.path();
        let is_match = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(is_history_file_name);
        if is_match && path.is_file() {
            files.push(path);
        }
    }

    files.sort_by(|a, b| b.file_name().cmp(&a.file_name()));
    Ok(files)
}

/// Load the `window` most recent historical snapshots, newest first.
pub fn load_history(dir: impl AsRef<Path>, window: usize) -> Result<Vec<SnapshotDocument>> {
    list_history_files(dir)?
        .into_iter()
        .take(window)
        .map(read_snapshot_document)
        .collect()
}
