//! YAML service configuration.
//!
//! # Storage layout
//!
//! ```text
//! ~/.warden/
//!   config.yaml     (mode 0600)
//!   eventlog/       (default event log root)
//! ```
//!
//! # API pattern
//!
//! Every function that touches disk has two forms:
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};

pub const DEFAULT_SERVICE_NAME: &str = "warden";
pub const DEFAULT_STOP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_EVENTLOG_MAX_BYTES: u64 = 10 * 1024 * 1024;
pub const DEFAULT_EVENTLOG_MAX_FILES: usize = 5;

const CONFIG_FILE: &str = "config.yaml";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Top-level service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Name used for the event log source.
    #[serde(default = "default_service_name")]
    pub service_name: String,
    pub worker: WorkerConfig,
    #[serde(default)]
    pub eventlog: EventLogConfig,
}

/// The command run as the background worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Program followed by its arguments.
    pub command: Vec<String>,
    /// How long `close` waits for the worker to exit after its stdin is
    /// closed before killing it.
    #[serde(default = "default_stop_timeout_secs")]
    pub stop_timeout_secs: u64,
}

impl WorkerConfig {
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLogConfig {
    /// Event log root; `None` means `~/.warden/eventlog`.
    #[serde(default)]
    pub root: Option<PathBuf>,
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
    #[serde(default = "default_max_files")]
    pub max_files: usize,
}

impl Default for EventLogConfig {
    fn default() -> Self {
        Self {
            root: None,
            max_bytes: DEFAULT_EVENTLOG_MAX_BYTES,
            max_files: DEFAULT_EVENTLOG_MAX_FILES,
        }
    }
}

fn default_service_name() -> String {
    DEFAULT_SERVICE_NAME.to_string()
}

fn default_stop_timeout_secs() -> u64 {
    DEFAULT_STOP_TIMEOUT_SECS
}

fn default_max_bytes() -> u64 {
    DEFAULT_EVENTLOG_MAX_BYTES
}

fn default_max_files() -> usize {
    DEFAULT_EVENTLOG_MAX_FILES
}

impl ServiceConfig {
    /// A config running `command` with every other field at its default.
    pub fn with_command(command: Vec<String>) -> Self {
        Self {
            service_name: default_service_name(),
            worker: WorkerConfig {
                command,
                stop_timeout_secs: DEFAULT_STOP_TIMEOUT_SECS,
            },
            eventlog: EventLogConfig::default(),
        }
    }

    /// Reject configs that cannot run a service.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.trim().is_empty() {
            return Err(ConfigError::Invalid("service_name must not be empty".into()));
        }
        match self.worker.command.first() {
            Some(program) if !program.trim().is_empty() => {}
            _ => {
                return Err(ConfigError::Invalid(
                    "worker.command must name a program".into(),
                ))
            }
        }
        if self.eventlog.max_files == 0 {
            return Err(ConfigError::Invalid(
                "eventlog.max_files must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Resolved event log root for this config under `home`.
    pub fn eventlog_root_at(&self, home: &Path) -> PathBuf {
        self.eventlog
            .root
            .clone()
            .unwrap_or_else(|| default_eventlog_root_at(home))
    }
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// `<home>/.warden/`
pub fn warden_root(home: &Path) -> PathBuf {
    home.join(".warden")
}

/// `<home>/.warden/config.yaml`: pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    warden_root(home).join(CONFIG_FILE)
}

/// `<home>/.warden/eventlog/`
pub fn default_eventlog_root_at(home: &Path) -> PathBuf {
    warden_root(home).join("eventlog")
}

// ---------------------------------------------------------------------------
// Load / save
// ---------------------------------------------------------------------------

/// Load and validate `<home>/.warden/config.yaml`.
pub fn load_at(home: &Path) -> Result<ServiceConfig, ConfigError> {
    load_from(&config_path_at(home))
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<ServiceConfig, ConfigError> {
    load_at(&home()?)
}

/// Load and validate a config file at an explicit path.
pub fn load_from(path: &Path) -> Result<ServiceConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let raw = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let config: ServiceConfig =
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    config.validate()?;
    Ok(config)
}

/// Atomically save the config to `<home>/.warden/config.yaml`.
///
/// Write flow: serialize → `.yaml.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_at(home: &Path, config: &ServiceConfig) -> Result<(), ConfigError> {
    config.validate()?;
    let root = warden_root(home);
    if !root.exists() {
        std::fs::create_dir_all(&root).map_err(|e| io_err(&root, e))?;
        set_dir_permissions(&root)?;
    }
    let path = config_path_at(home);
    let tmp_path = path.with_file_name(format!("{CONFIG_FILE}.tmp"));

    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&tmp_path, yaml).map_err(|e| io_err(&tmp_path, e))?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, &path).map_err(|e| io_err(&path, e))?;
    Ok(())
}

/// `save_at` convenience wrapper.
pub fn save(config: &ServiceConfig) -> Result<(), ConfigError> {
    save_at(&home()?, config)
}

/// Write a default config running `command`.
///
/// Idempotent: if a config already exists it is loaded and returned unchanged.
pub fn init_at(home: &Path, command: Vec<String>) -> Result<ServiceConfig, ConfigError> {
    if config_path_at(home).exists() {
        return load_at(home);
    }
    let config = ServiceConfig::with_command(command);
    save_at(home, &config)?;
    Ok(config)
}

/// `init_at` convenience wrapper.
pub fn init(command: Vec<String>) -> Result<ServiceConfig, ConfigError> {
    init_at(&home()?, command)
}

pub fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
