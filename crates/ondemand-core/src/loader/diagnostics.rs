//! Capture of load failures for later inspection (debug mode only).

use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// File name of the JSON lines log inside the cache directory.
pub const DIAGNOSTICS_FILE: &str = "diagnostics.jsonl";

/// One captured failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticRecord {
    /// Stable error code (`SYNTAX_TRANSFORM_ERROR`, `DEPENDENCY_TRANSFORM_FAILURE`, ...).
    pub kind: String,
    /// File that failed.
    pub file: PathBuf,
    /// Rendered error message.
    pub error: String,
    /// RFC 3339 UTC timestamp.
    pub timestamp: String,
}

impl DiagnosticRecord {
    /// Record for `error` at `file`, stamped now.
    #[must_use]
    pub fn new(kind: &str, file: &Path, error: impl Into<String>) -> Self {
        Self {
            kind: kind.to_string(),
            file: file.to_path_buf(),
            error: error.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Sink for debug-mode failure records.
pub trait DiagnosticCapture: Send + Sync {
    fn capture(&self, record: &DiagnosticRecord);
}

/// Appends records as JSON lines to a file.
#[derive(Debug)]
pub struct JsonlCapture {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonlCapture {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Capture into `<cache_dir>/diagnostics.jsonl`.
    #[must_use]
    pub fn in_cache_dir(cache_dir: &Path) -> Self {
        Self::new(cache_dir.join(DIAGNOSTICS_FILE))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, record: &DiagnosticRecord) -> std::io::Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.lock.lock().unwrap();
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?
            .write_all(line.as_bytes())
    }
}

impl DiagnosticCapture for JsonlCapture {
    fn capture(&self, record: &DiagnosticRecord) {
        if let Err(e) = self.append(record) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to write diagnostic record");
        }
    }
}
