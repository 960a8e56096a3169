//! File-backed event log.
//!
//! # Storage layout
//!
//! ```text
//! <root>/
//!   sources/
//!     <name>.json     (installed source manifest: allowed severities)
//!   <name>.jsonl      (one JSON record per line, append-only)
//!   <name>.jsonl.1…N  (rotated copies)
//! ```
//!
//! A source must be installed with [`install_source`] before it can be
//! opened. Every record is written and flushed on its own; nothing is
//! buffered between calls.

use std::collections::VecDeque;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{io_err, EventLogError};
use crate::rotation::{rotate_if_needed, MAX_LOG_BYTES, MAX_ROTATED_FILES};

/// Event identifier attached to every record the service writes.
pub const SERVICE_EVENT_ID: u32 = 1;

/// Record severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Error, Severity::Warning, Severity::Info];
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => f.write_str("info"),
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

/// One persisted event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub event_id: u32,
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct SourceManifest {
    name: String,
    severities: Vec<Severity>,
    installed_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// `<root>/sources/<name>.json`
pub fn manifest_path(root: &Path, name: &str) -> PathBuf {
    root.join("sources").join(format!("{name}.json"))
}

/// `<root>/<name>.jsonl`
pub fn records_path(root: &Path, name: &str) -> PathBuf {
    root.join(format!("{name}.jsonl"))
}

// ---------------------------------------------------------------------------
// Installation
// ---------------------------------------------------------------------------

/// Register `name` as an event source accepting `severities`.
///
/// Re-installing an existing source replaces its severity set. The manifest
/// is written to a `.tmp` sibling and renamed into place.
pub fn install_source(
    root: &Path,
    name: &str,
    severities: &[Severity],
) -> Result<(), EventLogError> {
    if name.trim().is_empty() {
        return Err(EventLogError::EmptySourceName);
    }

    let path = manifest_path(root, name);
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    }

    let manifest = SourceManifest {
        name: name.to_string(),
        severities: severities.to_vec(),
        installed_at: Utc::now(),
    };
    let tmp = path.with_file_name(format!("{name}.json.tmp"));
    fs::write(&tmp, serde_json::to_vec_pretty(&manifest)?).map_err(|e| io_err(&tmp, e))?;
    fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;

    tracing::debug!(source = name, root = %root.display(), "installed event log source");
    Ok(())
}

fn load_manifest(root: &Path, name: &str) -> Result<SourceManifest, EventLogError> {
    let path = manifest_path(root, name);
    if !path.exists() {
        return Err(EventLogError::SourceNotInstalled {
            source_name: name.to_string(),
            root: root.to_path_buf(),
        });
    }
    let raw = fs::read(&path).map_err(|e| io_err(&path, e))?;
    Ok(serde_json::from_slice(&raw)?)
}

// ---------------------------------------------------------------------------
// EventLog
// ---------------------------------------------------------------------------

/// An open handle to one installed source.
///
/// All methods take `&self`; the record file sits behind a mutex so the log
/// can be shared between the controller and the writer adapter.
#[derive(Debug)]
pub struct EventLog {
    source: String,
    path: PathBuf,
    allowed: Vec<Severity>,
    file: Mutex<Option<File>>,
}

impl EventLog {
    /// Open an installed source with the default rotation limits.
    pub fn open(root: &Path, name: &str) -> Result<Self, EventLogError> {
        Self::open_with_rotation(root, name, MAX_LOG_BYTES, MAX_ROTATED_FILES)
    }

    /// Open an installed source, rotating its record file first if it has
    /// grown past `max_bytes`.
    pub fn open_with_rotation(
        root: &Path,
        name: &str,
        max_bytes: u64,
        max_files: usize,
    ) -> Result<Self, EventLogError> {
        let manifest = load_manifest(root, name)?;
        let path = records_path(root, name);

        if rotate_if_needed(&path, max_bytes, max_files).map_err(|e| io_err(&path, e))? {
            tracing::info!(path = %path.display(), "event log rotated");
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| io_err(&path, e))?;

        Ok(Self {
            source: manifest.name,
            path,
            allowed: manifest.severities,
            file: Mutex::new(Some(file)),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn info(&self, event_id: u32, message: &str) -> Result<(), EventLogError> {
        self.report(Severity::Info, event_id, message)
    }

    pub fn warning(&self, event_id: u32, message: &str) -> Result<(), EventLogError> {
        self.report(Severity::Warning, event_id, message)
    }

    pub fn error(&self, event_id: u32, message: &str) -> Result<(), EventLogError> {
        self.report(Severity::Error, event_id, message)
    }

    /// Append one record and flush it.
    pub fn report(
        &self,
        severity: Severity,
        event_id: u32,
        message: &str,
    ) -> Result<(), EventLogError> {
        let mut guard = self.lock();
        let Some(file) = guard.as_mut() else {
            return Err(EventLogError::Closed {
                source_name: self.source.clone(),
            });
        };

        if !self.allowed.contains(&severity) {
            return Err(EventLogError::SeverityNotAllowed {
                source_name: self.source.clone(),
                severity,
            });
        }

        let record = EventRecord {
            timestamp: Utc::now(),
            source: self.source.clone(),
            event_id,
            severity,
            message: message.to_string(),
        };
        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');

        file.write_all(&line).map_err(|e| io_err(&self.path, e))?;
        file.flush().map_err(|e| io_err(&self.path, e))?;
        Ok(())
    }

    /// Close the record file. Later writes fail with [`EventLogError::Closed`].
    pub fn close(&self) {
        self.lock().take();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().is_none()
    }

    fn lock(&self) -> MutexGuard<'_, Option<File>> {
        self.file.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// ---------------------------------------------------------------------------
// Readers
// ---------------------------------------------------------------------------

/// Return the trailing `limit` records for `name` (oldest first).
///
/// A source with no record file yet yields an empty list.
pub fn read_records(
    root: &Path,
    name: &str,
    limit: usize,
) -> Result<Vec<EventRecord>, EventLogError> {
    let path = records_path(root, name);
    if !path.exists() {
        return Ok(vec![]);
    }

    let file = File::open(&path).map_err(|e| io_err(&path, e))?;
    let mut tail = VecDeque::<EventRecord>::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| io_err(&path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        if tail.len() == limit {
            tail.pop_front();
        }
        if limit > 0 {
            tail.push_back(serde_json::from_str(&line)?);
        }
    }
    Ok(tail.into())
}
