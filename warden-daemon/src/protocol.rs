//! Newline-delimited JSON bridge between an external supervisor and the
//! in-process host channel.
//!
//! Requests arrive one JSON object per line, by name or by raw host code:
//!
//! ```text
//! {"cmd":"pause"}
//! {"code":5}
//! ```
//!
//! Every status report is written back as one JSON line:
//!
//! ```text
//! {"state":"paused","accepts":["stop","shutdown","continue"]}
//! ```

use std::io::BufRead;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use warden_core::types::{ControlRequest, StatusReport};

use crate::error::DaemonError;

/// One request line.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmd: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u32>,
}

impl HostRequest {
    pub fn named(cmd: impl Into<String>) -> Self {
        Self {
            cmd: Some(cmd.into()),
            code: None,
        }
    }

    pub fn code(code: u32) -> Self {
        Self {
            cmd: None,
            code: Some(code),
        }
    }

    /// Resolve to a control request. A name wins over a code when both are set.
    pub fn into_control(self) -> Result<ControlRequest, DaemonError> {
        match (self.cmd, self.code) {
            (Some(cmd), _) => ControlRequest::from_name(&cmd)
                .ok_or_else(|| DaemonError::Protocol(format!("unknown command '{cmd}'"))),
            (None, Some(code)) => Ok(ControlRequest::from_code(code)),
            (None, None) => Err(DaemonError::Protocol(
                "request needs either \"cmd\" or \"code\"".to_string(),
            )),
        }
    }
}

/// Parse one line. Blank lines yield `Ok(None)`.
pub fn parse_request_line(line: &str) -> Result<Option<ControlRequest>, DaemonError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let request: HostRequest = serde_json::from_str(line)?;
    request.into_control().map(Some)
}

/// Read request lines until EOF or until the controller stops listening.
///
/// Malformed lines are logged and skipped. Runs on a plain thread: blocking
/// reads from stdin must not hold up runtime shutdown.
pub fn pump_requests_blocking<R: BufRead>(
    reader: R,
    requests: mpsc::Sender<ControlRequest>,
) -> Result<(), DaemonError> {
    for line in reader.lines() {
        let line = line.map_err(|e| crate::error::io_err("host request stream", e))?;
        let request = match parse_request_line(&line) {
            Ok(Some(request)) => request,
            Ok(None) => continue,
            Err(err) => {
                tracing::warn!(error = %err, "ignoring malformed host request");
                continue;
            }
        };
        if requests.blocking_send(request).is_err() {
            break;
        }
    }
    Ok(())
}

/// Write every report as a JSON line until the controller drops its sender.
pub async fn pump_reports<W>(
    mut reports: mpsc::UnboundedReceiver<StatusReport>,
    mut writer: W,
) -> Result<(), DaemonError>
where
    W: AsyncWrite + Unpin,
{
    while let Some(report) = reports.recv().await {
        let mut line = serde_json::to_vec(&report)?;
        line.push(b'\n');
        writer
            .write_all(&line)
            .await
            .map_err(|e| crate::error::io_err("host report stream", e))?;
        writer
            .flush()
            .await
            .map_err(|e| crate::error::io_err("host report stream", e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use warden_core::types::ServiceState;

    #[test]
    fn named_and_coded_requests_parse() {
        assert_eq!(
            parse_request_line(r#"{"cmd":"pause"}"#).unwrap(),
            Some(ControlRequest::Pause)
        );
        assert_eq!(
            parse_request_line(r#"{"code":5}"#).unwrap(),
            Some(ControlRequest::Shutdown)
        );
        assert_eq!(
            parse_request_line(r#"{"code":200}"#).unwrap(),
            Some(ControlRequest::Unknown(200))
        );
        assert_eq!(parse_request_line("   ").unwrap(), None);
    }

    #[test]
    fn unknown_name_is_a_protocol_error() {
        let err = parse_request_line(r#"{"cmd":"restart"}"#).unwrap_err();
        assert!(matches!(err, DaemonError::Protocol(_)));
        assert!(err.to_string().contains("restart"));
    }

    #[test]
    fn empty_object_is_a_protocol_error() {
        assert!(matches!(
            parse_request_line("{}").unwrap_err(),
            DaemonError::Protocol(_)
        ));
    }

    #[test]
    fn request_serializes_without_empty_fields() {
        let encoded = serde_json::to_string(&HostRequest::named("stop")).unwrap();
        assert_eq!(encoded, r#"{"cmd":"stop"}"#);
        let encoded = serde_json::to_string(&HostRequest::code(4)).unwrap();
        assert_eq!(encoded, r#"{"code":4}"#);
    }

    #[test]
    fn pump_skips_garbage_and_keeps_order() {
        let input = "{\"cmd\":\"interrogate\"}\nnot json\n\n{\"code\":2}\n{\"cmd\":\"stop\"}\n";
        let (tx, mut rx) = mpsc::channel(8);

        pump_requests_blocking(Cursor::new(input), tx).expect("pump");

        let mut received = Vec::new();
        while let Ok(request) = rx.try_recv() {
            received.push(request);
        }
        assert_eq!(
            received,
            vec![
                ControlRequest::Interrogate,
                ControlRequest::Pause,
                ControlRequest::Stop
            ]
        );
    }

    #[tokio::test]
    async fn reports_are_written_as_json_lines() {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(StatusReport::running()).unwrap();
        tx.send(StatusReport::stop_pending()).unwrap();
        drop(tx);

        let mut out = Vec::new();
        pump_reports(rx, &mut out).await.expect("pump");

        let text = String::from_utf8(out).unwrap();
        let reports: Vec<StatusReport> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].state, ServiceState::Running);
        assert_eq!(reports[1].state, ServiceState::StopPending);
    }
}
