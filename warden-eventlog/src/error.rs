//! Error types for warden-eventlog.

use std::path::PathBuf;

use thiserror::Error;

use crate::store::Severity;

/// All errors that can arise from event log installation and writes.
#[derive(Debug, Error)]
pub enum EventLogError {
    /// I/O failure, annotated with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Source manifest or record could not be (de)serialized.
    #[error("event log JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("event log source name must not be empty")]
    EmptySourceName,

    /// `open` was called for a source that was never installed.
    #[error("event log source '{source_name}' is not installed under {root}")]
    SourceNotInstalled { source_name: String, root: PathBuf },

    /// The source was installed without this severity.
    #[error("event log source '{source_name}' does not accept {severity} records")]
    SeverityNotAllowed {
        source_name: String,
        severity: Severity,
    },

    /// A write arrived after [`crate::EventLog::close`].
    #[error("event log source '{source_name}' is closed")]
    Closed { source_name: String },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> EventLogError {
    EventLogError::Io {
        path: path.into(),
        source,
    }
}
