//! warden core library: lifecycle types, service configuration, errors.
//!
//! - [`types`]: service states, control requests, status reports
//! - [`config`]: YAML service configuration under `~/.warden/`
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod types;

pub use config::{EventLogConfig, ServiceConfig, WorkerConfig};
pub use error::ConfigError;
pub use types::{Accepts, ControlRequest, ServiceState, StatusReport};
