//! Size-based rotation for event log record files.
//!
//! `warden.jsonl` → `warden.jsonl.1` → … → `warden.jsonl.<max_files>`;
//! the oldest copy is dropped once `max_files` backups exist.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Default record-file size before rotation (10 MiB).
pub const MAX_LOG_BYTES: u64 = 10 * 1024 * 1024;

/// Default number of rotated backups kept.
pub const MAX_ROTATED_FILES: usize = 5;

/// Rotate `path` if it is at least `max_bytes` long.
///
/// Returns `true` if a rotation happened. A missing file is not an error; it
/// simply has nothing to rotate. The live file is renamed away and not
/// recreated: the next open in append mode creates it.
pub fn rotate_if_needed(path: &Path, max_bytes: u64, max_files: usize) -> io::Result<bool> {
    let size = match fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    };
    if size < max_bytes || max_files == 0 {
        return Ok(false);
    }

    let oldest = numbered_path(path, max_files);
    if oldest.exists() {
        fs::remove_file(&oldest)?;
    }
    for n in (1..max_files).rev() {
        let src = numbered_path(path, n);
        if src.exists() {
            fs::rename(&src, numbered_path(path, n + 1))?;
        }
    }
    fs::rename(path, numbered_path(path, 1))?;
    Ok(true)
}

/// `<path>.<n>`, e.g. `warden.jsonl.2`.
pub fn numbered_path(path: &Path, n: usize) -> PathBuf {
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("events.jsonl");
    path.with_file_name(format!("{name}.{n}"))
}
