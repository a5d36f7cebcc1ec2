// Copyright 2026 Benchwatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! GitHub Actions workflow integration.
//!
//! Step outputs are appended to the file named by `$GITHUB_OUTPUT`;
//! annotations are workflow commands printed to stdout.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Delimiter for multi-line output values.
const MULTILINE_DELIMITER: &str = "BENCHWATCH_EOF";

/// Errors that can occur while writing step outputs.
#[derive(Debug, Error)]
pub enum OutputError {
    /// The output file could not be written
    #[error("Failed to write step outputs to {path}: {source}")]
    Io {
        /// Output file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Output names must be non-empty and free of `=` and newlines
    #[error("Invalid output name: {0:?}")]
    InvalidName(String),
}

/// Result type for step outputs.
pub type Result<T> = std::result::Result<T, OutputError>;

/// Severity of a workflow annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationLevel {
    /// `::notice::`
    Notice,
    /// `::warning::`
    Warning,
    /// `::error::`
    Error,
}

impl fmt::Display for AnnotationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Notice => write!(f, "notice"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Format a workflow annotation command.
///
/// `%`, `\r` and `\n` in the message are escaped so multi-line messages
/// stay a single command.
pub fn annotation(level: AnnotationLevel, message: &str) -> String {
    let escaped = message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A");
    format!("::{}::{}", level, escaped)
}

fn render_output(name: &str, value: &str) -> Result<String> {
    if name.is_empty() || name.contains('=') || name.contains('\n') {
        return Err(OutputError::InvalidName(name.to_string()));
    }
    if value.contains('\n') {
        Ok(format!(
            "{name}<<{delim}\n{value}\n{delim}\n",
            delim = MULTILINE_DELIMITER
        ))
    } else {
        Ok(format!("{}={}\n", name, value))
    }
}

/// Append step outputs to `path`, creating it if needed.
pub fn append_outputs<K, V>(path: impl AsRef<Path>, outputs: &[(K, V)]) -> Result<()>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let path = path.as_ref();
    let mut rendered = String::new();
    for (name, value) in outputs {
        rendered.push_str(&render_output(name.as_ref(), value.as_ref())?);
    }

    let io_err = |source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_err)?;
    file.write_all(rendered.as_bytes()).map_err(io_err)?;

    debug!(path = %path.display(), count = outputs.len(), "Wrote step outputs");
    Ok(())
}

/// Append step outputs when running under Actions; a no-op otherwise.
pub fn write_outputs<K, V>(path: Option<&Path>, outputs: &[(K, V)]) -> Result<()>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    match path {
        Some(path) => append_outputs(path, outputs),
        None => {
            debug!("No step output file configured");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_annotation_escaping() {
        assert_eq!(
            annotation(AnnotationLevel::Warning, "Regression in msm latency: 15.0% slower"),
            "::warning::Regression in msm latency: 15.0% slower"
        );
        assert_eq!(
            annotation(AnnotationLevel::Notice, "a 5%\nb"),
            "::notice::a 5%25%0Ab"
        );
    }

    #[test]
    fn test_append_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output");
        fs::write(&path, "existing=1\n").unwrap();

        append_outputs(&path, &[("has_significant_change", "true"), ("change_type", "mixed")]).unwrap();
        append_outputs(&path, &[("notes", "line 1\nline 2")]).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "existing=1\nhas_significant_change=true\nchange_type=mixed\n\
             notes<<BENCHWATCH_EOF\nline 1\nline 2\nBENCHWATCH_EOF\n"
        );
    }

    #[test]
    fn test_invalid_name_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output");

        let err = append_outputs(&path, &[("ok", "1"), ("bad=name", "2")]).unwrap_err();
        assert!(matches!(err, OutputError::InvalidName(_)));
        assert!(!path.exists());
    }

    #[test]
    fn test_write_outputs_without_path() {
        write_outputs::<&str, &str>(None, &[("a", "b")]).unwrap();
    }
}
