//! The event log adapter as ordinary logging sees it: through `io::Write`
//! and through a tracing subscriber writing to a `LogOutput`.

use std::io::Write;
use std::sync::Arc;

use tempfile::TempDir;
use warden_eventlog::{
    install_source, read_records, EventLog, EventLogError, EventLogWriter, LogOutput, Severity,
    SERVICE_EVENT_ID,
};

fn open_log(root: &std::path::Path) -> Arc<EventLog> {
    install_source(root, "warden", &Severity::ALL).expect("install source");
    Arc::new(EventLog::open(root, "warden").expect("open event log"))
}

#[test]
fn hello_becomes_one_info_record() {
    let root = TempDir::new().expect("root");
    let mut writer = EventLogWriter::new(open_log(root.path()));

    writer.write_all(b"hello").expect("write");

    let records = read_records(root.path(), "warden", 100).expect("read");
    assert_eq!(records.len(), 1, "exactly one record per write");
    assert_eq!(records[0].message, "hello");
    assert_eq!(records[0].severity, Severity::Info);
    assert_eq!(records[0].event_id, SERVICE_EVENT_ID);
    assert_eq!(records[0].source, "warden");
}

#[test]
fn write_after_close_returns_sink_error() {
    let root = TempDir::new().expect("root");
    let log = open_log(root.path());
    let mut writer = EventLogWriter::new(Arc::clone(&log));

    log.close();
    let err = writer.write(b"too late").unwrap_err();

    let inner = err
        .into_inner()
        .expect("sink error is carried inside the io::Error");
    let sink_err = inner
        .downcast::<EventLogError>()
        .expect("inner error is the event log's own error");
    assert!(matches!(*sink_err, EventLogError::Closed { .. }), "got: {sink_err}");
}

#[test]
fn tracing_events_land_in_event_log_while_installed() {
    let root = TempDir::new().expect("root");
    let log = open_log(root.path());
    let output = LogOutput::stderr();

    let subscriber = tracing_subscriber::fmt()
        .with_writer(output.clone())
        .with_ansi(false)
        .with_target(false)
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        let guard = output.install(EventLogWriter::new(Arc::clone(&log)));
        tracing::info!("replication worker started");
        drop(guard);
        tracing::info!("back on stderr");
    });

    let records = read_records(root.path(), "warden", 100).expect("read");
    assert_eq!(records.len(), 1, "only the event emitted while installed is recorded");
    assert!(records[0].message.contains("replication worker started"));
    assert!(!records[0].message.ends_with('\n'));
}
