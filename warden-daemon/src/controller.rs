//! Service lifecycle state machine.
//!
//! The controller owns at most one worker instance and translates the host's
//! serial stream of control requests into worker starts and closes, emitting
//! a status report after every transition:
//!
//! | Request     | Worker action                 | Report                      |
//! |-------------|-------------------------------|-----------------------------|
//! | Interrogate | none                          | last report, unchanged      |
//! | Stop        | close live instance           | StopPending, then exit      |
//! | Shutdown    | close live instance           | StopPending, then exit      |
//! | Pause       | close live instance           | Paused                      |
//! | Continue    | fresh start if none is live   | Running                     |
//! | Unknown     | none (logged as error)        | none                        |
//!
//! Pause tears the worker down and Continue starts a new instance; nothing
//! carries over between the two.

use tokio::sync::mpsc;

use warden_core::types::{ControlRequest, ServiceState, StatusReport};

use crate::error::DaemonError;
use crate::host::ControlChannel;
use crate::shutdown::ShutdownToken;
use crate::worker::Worker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

/// Drives one worker through the host's control requests.
pub struct ServiceController<W: Worker> {
    worker: W,
    shutdown: ShutdownToken,
    instance: Option<W::Instance>,
    last_report: StatusReport,
}

impl<W: Worker> ServiceController<W> {
    /// `shutdown` is the process-scoped token handed to every worker start.
    pub fn new(worker: W, shutdown: ShutdownToken) -> Self {
        Self {
            worker,
            shutdown,
            instance: None,
            last_report: StatusReport::start_pending(),
        }
    }

    pub fn state(&self) -> ServiceState {
        self.last_report.state
    }

    /// Start the worker, then process requests until Stop or Shutdown.
    ///
    /// Returns `Ok(())` once a Stop/Shutdown has closed the worker and the
    /// StopPending report was sent. On any error the live instance, if any,
    /// is closed before the error is returned.
    pub async fn run(mut self, channel: ControlChannel) -> Result<(), DaemonError> {
        let result = self.drive(channel).await;
        if result.is_err() {
            self.close_instance().await;
        }
        result
    }

    async fn drive(&mut self, channel: ControlChannel) -> Result<(), DaemonError> {
        let ControlChannel {
            mut requests,
            reports,
        } = channel;

        self.emit(&reports, StatusReport::start_pending())?;
        self.instance = Some(self.worker.start(self.shutdown.clone()).await);
        self.emit(&reports, StatusReport::running())?;
        tracing::info!("service running");

        let shutdown = self.shutdown.clone();
        loop {
            let request = tokio::select! {
                biased;
                request = requests.recv() => request,
                _ = shutdown.cancelled() => {
                    tracing::info!("process shutdown requested");
                    Some(ControlRequest::Shutdown)
                }
            };
            let Some(request) = request else {
                tracing::error!("host closed the control channel");
                return Err(DaemonError::ChannelClosed("control requests"));
            };

            if self.handle(request, &reports).await? == Flow::Exit {
                return Ok(());
            }
        }
    }

    async fn handle(
        &mut self,
        request: ControlRequest,
        reports: &mpsc::UnboundedSender<StatusReport>,
    ) -> Result<Flow, DaemonError> {
        match request {
            ControlRequest::Interrogate => {
                tracing::info!(state = %self.state(), "service interrogated");
                self.emit(reports, self.last_report)?;
            }
            ControlRequest::Stop | ControlRequest::Shutdown => {
                tracing::info!(%request, "service stopping");
                self.close_instance().await;
                self.emit(reports, StatusReport::stop_pending())?;
                return Ok(Flow::Exit);
            }
            ControlRequest::Pause => match self.instance.take() {
                Some(mut instance) => {
                    tracing::info!("service pausing");
                    self.worker.close(&mut instance).await;
                    self.emit(reports, StatusReport::paused())?;
                }
                None => {
                    tracing::info!("pause requested while already paused");
                    self.emit(reports, self.last_report)?;
                }
            },
            ControlRequest::Continue => {
                if self.instance.is_some() {
                    tracing::info!("continue requested while running");
                    self.emit(reports, self.last_report)?;
                } else if self.shutdown.is_cancelled() {
                    // The pending shutdown is picked up on the next loop turn.
                    tracing::info!("continue ignored; process shutdown in progress");
                    self.emit(reports, self.last_report)?;
                } else {
                    tracing::info!("service continuing");
                    self.instance = Some(self.worker.start(self.shutdown.clone()).await);
                    self.emit(reports, StatusReport::running())?;
                }
            }
            ControlRequest::Unknown(code) => {
                tracing::error!(code, "unexpected control request #{code}");
            }
        }
        Ok(Flow::Continue)
    }

    async fn close_instance(&mut self) {
        if let Some(mut instance) = self.instance.take() {
            self.worker.close(&mut instance).await;
        }
    }

    fn emit(
        &mut self,
        reports: &mpsc::UnboundedSender<StatusReport>,
        report: StatusReport,
    ) -> Result<(), DaemonError> {
        reports
            .send(report)
            .map_err(|_| DaemonError::ReportChannelClosed)?;
        tracing::debug!(state = %report.state, "status reported");
        self.last_report = report;
        Ok(())
    }
}
