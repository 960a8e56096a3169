//! `io::Write` adapter over an [`EventLog`].

use std::io;
use std::sync::Arc;

use crate::store::{EventLog, SERVICE_EVENT_ID};

/// Emits one informational record per `write` call.
///
/// The buffer is read as UTF-8 (invalid sequences replaced) and a single
/// trailing line terminator is dropped, so a formatted log line becomes one
/// record without an empty tail. Sink failures come back as
/// `io::Error::other(EventLogError)`; downcast the inner error to inspect it.
#[derive(Debug, Clone)]
pub struct EventLogWriter {
    log: Arc<EventLog>,
    event_id: u32,
}

impl EventLogWriter {
    pub fn new(log: Arc<EventLog>) -> Self {
        Self {
            log,
            event_id: SERVICE_EVENT_ID,
        }
    }

    pub fn with_event_id(mut self, event_id: u32) -> Self {
        self.event_id = event_id;
        self
    }

    pub fn event_log(&self) -> &Arc<EventLog> {
        &self.log
    }
}

impl io::Write for EventLogWriter {
    /// Reports the whole buffer as written; `write_all` relies on a non-zero
    /// count to make progress.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = String::from_utf8_lossy(buf);
        let message = text
            .strip_suffix("\r\n")
            .or_else(|| text.strip_suffix('\n'))
            .unwrap_or(&text);
        self.log
            .info(self.event_id, message)
            .map_err(io::Error::other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
