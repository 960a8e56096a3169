//! Service runtime: lifecycle controller, worker supervision, host bridge.

pub mod controller;
mod error;
pub mod host;
pub mod protocol;
mod runtime;
pub mod shutdown;
pub mod worker;

pub use controller::ServiceController;
pub use error::DaemonError;
pub use host::{ControlChannel, HostHandle};
pub use protocol::{parse_request_line, HostRequest};
pub use runtime::{
    init_tracing, run_interactive, run_service, run_stdio_service, start_blocking, RunMode,
    REQUEST_BUFFER,
};
pub use shutdown::{ShutdownSource, ShutdownToken};
pub use worker::{LocalWorker, ProcessInstance, ProcessWorker, Worker};
