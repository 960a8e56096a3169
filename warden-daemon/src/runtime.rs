//! Process bootstrap: config, tracing, the tokio runtime, and the two run
//! modes. Service mode routes logging into the event log for the whole run.

use std::path::Path;
use std::sync::Arc;

use warden_core::config::{self, ServiceConfig};
use warden_eventlog::{
    install_source, EventLog, EventLogWriter, LogOutput, Severity, SERVICE_EVENT_ID,
};

use crate::controller::ServiceController;
use crate::error::{io_err, DaemonError};
use crate::host::{self, ControlChannel, HostHandle};
use crate::protocol::{pump_reports, pump_requests_blocking};
use crate::shutdown::{ShutdownSource, ShutdownToken};
use crate::worker::{ProcessWorker, Worker};

/// Undelivered control requests buffered between the host bridge and the controller.
pub const REQUEST_BUFFER: usize = 16;

/// How the process was launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Foreground: run the worker until Ctrl-C, logging to stderr.
    Interactive,
    /// Host-controlled: control requests on stdin, status reports on stdout,
    /// logging into the event log.
    Service,
}

/// Load the config under `home`, then run in `mode` on a fresh runtime,
/// blocking the current thread until the service exits.
pub fn start_blocking(home: &Path, mode: RunMode) -> Result<(), DaemonError> {
    let config = config::load_at(home)?;
    let eventlog_root = config.eventlog_root_at(home);

    let output = LogOutput::stderr();
    init_tracing(output.clone());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;

    let shutdown = Arc::new(ShutdownSource::new());
    runtime.block_on(async move {
        match mode {
            RunMode::Interactive => run_interactive(&config, shutdown).await,
            RunMode::Service => {
                spawn_ctrl_c_watcher(Arc::clone(&shutdown));
                run_stdio_service(&config, &eventlog_root, &output, &shutdown).await
            }
        }
    })
}

/// Run the configured worker in the foreground until Ctrl-C.
pub async fn run_interactive(
    config: &ServiceConfig,
    shutdown: Arc<ShutdownSource>,
) -> Result<(), DaemonError> {
    let mut worker = ProcessWorker::from_config(&config.worker);
    let token = shutdown.token();
    let mut instance = worker.start(token.clone()).await;
    tracing::info!(service = %config.service_name, "running in foreground; press Ctrl-C to stop");

    let signal = tokio::select! {
        signal = tokio::signal::ctrl_c() => signal,
        _ = token.cancelled() => Ok(()),
    };
    if signal.is_ok() && shutdown.cancel() {
        tracing::info!("received ctrl-c, shutting down");
    }

    worker.close(&mut instance).await;
    signal.map_err(|e| io_err("ctrl-c handler", e))
}

/// Serve the host over stdin/stdout with the configured process worker.
pub async fn run_stdio_service(
    config: &ServiceConfig,
    eventlog_root: &Path,
    output: &LogOutput,
    shutdown: &ShutdownSource,
) -> Result<(), DaemonError> {
    let (host, channel) = host::channel(REQUEST_BUFFER);
    let HostHandle { requests, reports } = host;

    std::thread::Builder::new()
        .name("warden-host-requests".to_string())
        .spawn(move || {
            if let Err(err) = pump_requests_blocking(std::io::stdin().lock(), requests) {
                tracing::error!(error = %err, "host request stream failed");
            }
        })
        .map_err(|e| io_err("host request thread", e))?;

    let writer = tokio::spawn(pump_reports(reports, tokio::io::stdout()));

    let worker = ProcessWorker::from_config(&config.worker);
    let result = run_service(config, eventlog_root, output, worker, shutdown.token(), channel).await;

    match writer.await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => tracing::error!(error = %err, "host report stream failed"),
        Err(err) => tracing::error!(error = %err, "host report task join failure"),
    }
    result
}

/// Run the controller with the event log installed as the log destination.
///
/// The event log source is installed first; if that fails the controller
/// never starts. Logging is routed into the event log for exactly the
/// duration of this call.
pub async fn run_service<W: Worker>(
    config: &ServiceConfig,
    eventlog_root: &Path,
    output: &LogOutput,
    worker: W,
    shutdown: ShutdownToken,
    channel: ControlChannel,
) -> Result<(), DaemonError> {
    let name = config.service_name.as_str();
    install_source(eventlog_root, name, &Severity::ALL)?;
    let log = Arc::new(EventLog::open_with_rotation(
        eventlog_root,
        name,
        config.eventlog.max_bytes,
        config.eventlog.max_files,
    )?);

    let guard = output.install(EventLogWriter::new(Arc::clone(&log)));
    log.info(SERVICE_EVENT_ID, &format!("{name} service starting"))?;

    let result = ServiceController::new(worker, shutdown).run(channel).await;

    drop(guard);
    finish_service(&log, name, &result);
    result
}

/// Record how the service ended, then close the log so stray writers
/// holding it fail with `Closed` instead of appending.
fn finish_service(log: &EventLog, name: &str, result: &Result<(), DaemonError>) {
    let outcome = match result {
        Ok(()) => log.info(SERVICE_EVENT_ID, &format!("{name} service exited")),
        Err(err) => log.error(SERVICE_EVENT_ID, &format!("{name} service failed: {err}")),
    };
    if let Err(err) = outcome {
        tracing::warn!(error = %err, "could not record service outcome");
    }
    log.close();
}

fn spawn_ctrl_c_watcher(shutdown: Arc<ShutdownSource>) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                if shutdown.cancel() {
                    tracing::info!("received ctrl-c, shutting down service");
                }
            }
            Err(err) => tracing::error!(error = %err, "ctrl-c handler failed"),
        }
    });
}

/// Install the global subscriber writing through `output`.
///
/// `RUST_LOG` overrides the default `info` filter. A second call is a no-op.
pub fn init_tracing(output: LogOutput) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(output)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tempfile::TempDir;
    use warden_core::types::{ControlRequest, ServiceState};
    use warden_eventlog::{read_records, EventLogError};

    fn config() -> ServiceConfig {
        ServiceConfig::with_command(vec!["cat".to_string()])
    }

    #[derive(Debug, Default)]
    struct IdleWorker;

    impl Worker for IdleWorker {
        type Instance = ();

        async fn start(&mut self, _shutdown: ShutdownToken) {}

        async fn close(&mut self, _instance: &mut ()) {}
    }

    #[tokio::test]
    async fn service_records_start_and_exit_in_event_log() {
        let root = TempDir::new().expect("root");
        let source = ShutdownSource::new();
        let (mut host, channel) = host::channel(4);
        host.send(ControlRequest::Stop).await.expect("send stop");

        run_service(
            &config(),
            root.path(),
            &LogOutput::stderr(),
            IdleWorker,
            source.token(),
            channel,
        )
        .await
        .expect("service run");

        let records = read_records(root.path(), "warden", 100).expect("read");
        let messages: Vec<_> = records.iter().map(|r| r.message.as_str()).collect();
        assert_eq!(messages.first(), Some(&"warden service starting"));
        assert_eq!(messages.last(), Some(&"warden service exited"));

        let mut last = None;
        while let Some(report) = host.next_report().await {
            last = Some(report.state);
        }
        assert_eq!(last, Some(ServiceState::StopPending));
    }

    #[tokio::test]
    async fn host_disconnect_is_recorded_as_failure() {
        let root = TempDir::new().expect("root");
        let source = ShutdownSource::new();
        let (host, channel) = host::channel(4);
        let HostHandle { requests, reports: _reports } = host;
        drop(requests);

        let err = run_service(
            &config(),
            root.path(),
            &LogOutput::stderr(),
            IdleWorker,
            source.token(),
            channel,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DaemonError::ChannelClosed(_)));

        let records = read_records(root.path(), "warden", 100).expect("read");
        let last = records.last().expect("at least one record");
        assert_eq!(last.severity, Severity::Error);
        assert!(last.message.contains("service failed"));
    }

    #[tokio::test]
    async fn unwritable_eventlog_root_prevents_start() {
        let dir = TempDir::new().expect("dir");
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").expect("write blocker");

        let source = ShutdownSource::new();
        let (mut host, channel) = host::channel(4);

        let err = run_service(
            &config(),
            &blocker,
            &LogOutput::stderr(),
            IdleWorker,
            source.token(),
            channel,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DaemonError::EventLog(_)));
        assert!(
            tokio::time::timeout(Duration::from_millis(50), host.next_report())
                .await
                .expect("channel closed")
                .is_none(),
            "no report is sent when the event log cannot be installed"
        );
    }

    #[test]
    fn finishing_the_service_closes_the_log() {
        let root = TempDir::new().expect("root");
        install_source(root.path(), "warden", &Severity::ALL).expect("install");
        let log = Arc::new(EventLog::open(root.path(), "warden").expect("open"));
        let mut stray = EventLogWriter::new(Arc::clone(&log));

        finish_service(&log, "warden", &Ok(()));

        assert!(log.is_closed());
        let err = std::io::Write::write(&mut stray, b"late line").unwrap_err();
        let inner = err
            .get_ref()
            .and_then(|e| e.downcast_ref::<EventLogError>())
            .expect("event log error");
        assert!(matches!(inner, EventLogError::Closed { .. }));

        let records = read_records(root.path(), "warden", 10).expect("read");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message, "warden service exited");
    }

    #[tokio::test]
    async fn process_shutdown_stops_the_service() {
        let root = TempDir::new().expect("root");
        let source = ShutdownSource::new();
        let (_host, channel) = host::channel(4);
        source.cancel();

        run_service(
            &config(),
            root.path(),
            &LogOutput::stderr(),
            IdleWorker,
            source.token(),
            channel,
        )
        .await
        .expect("shutdown is a clean exit");
    }
}
