use std::path::PathBuf;

use thiserror::Error;

/// Error surface for the controller, the host bridge and the runtime.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config error: {0}")]
    Config(#[from] warden_core::ConfigError),

    #[error("event log error: {0}")]
    EventLog(#[from] warden_eventlog::EventLogError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The host stopped delivering control requests before Stop/Shutdown.
    #[error("channel closed: {0}")]
    ChannelClosed(&'static str),

    /// A status report could not be delivered; the host is gone.
    #[error("status report channel closed; host is no longer listening")]
    ReportChannelClosed,

    #[error("host protocol error: {0}")]
    Protocol(String),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
