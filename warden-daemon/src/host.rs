//! In-process channel between the service host and the controller.
//!
//! Control requests flow host → controller over a bounded channel and are
//! consumed strictly in order. Status reports flow controller → host over an
//! unbounded channel so emitting a report never blocks; a send only fails
//! once the host side has been dropped.

use tokio::sync::mpsc;

use warden_core::types::{ControlRequest, StatusReport};

/// The controller's end: read requests, emit reports.
#[derive(Debug)]
pub struct ControlChannel {
    pub requests: mpsc::Receiver<ControlRequest>,
    pub reports: mpsc::UnboundedSender<StatusReport>,
}

/// The host's end: deliver requests, observe reports.
#[derive(Debug)]
pub struct HostHandle {
    pub requests: mpsc::Sender<ControlRequest>,
    pub reports: mpsc::UnboundedReceiver<StatusReport>,
}

impl HostHandle {
    /// Deliver one request. Fails if the controller has exited.
    pub async fn send(
        &self,
        request: ControlRequest,
    ) -> Result<(), mpsc::error::SendError<ControlRequest>> {
        self.requests.send(request).await
    }

    /// Wait for the next report; `None` once the controller has exited and
    /// every emitted report has been received.
    pub async fn next_report(&mut self) -> Option<StatusReport> {
        self.reports.recv().await
    }
}

/// Create a connected host/controller pair. `capacity` bounds the number of
/// undelivered control requests.
pub fn channel(capacity: usize) -> (HostHandle, ControlChannel) {
    let (request_tx, request_rx) = mpsc::channel(capacity);
    let (report_tx, report_rx) = mpsc::unbounded_channel();
    (
        HostHandle {
            requests: request_tx,
            reports: report_rx,
        },
        ControlChannel {
            requests: request_rx,
            reports: report_tx,
        },
    )
}
