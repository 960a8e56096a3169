//! # warden-eventlog
//!
//! A named, pre-registered event log and the adapters that route ordinary
//! logging into it.
//!
//! - [`store`]: source installation, the append-only record file, readers
//! - [`writer`]: [`EventLogWriter`], an `io::Write` that emits one info record per write
//! - [`output`]: [`LogOutput`], the swappable process log destination, and its guard
//! - [`rotation`]: size-based rotation of record files

pub mod error;
pub mod output;
pub mod rotation;
pub mod store;
pub mod writer;

pub use error::EventLogError;
pub use output::{LogOutput, OutputGuard};
pub use store::{install_source, read_records, EventLog, EventRecord, Severity, SERVICE_EVENT_ID};
pub use writer::EventLogWriter;
