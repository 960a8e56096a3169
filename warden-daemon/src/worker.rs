//! The background worker capability and the child-process implementation.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use warden_core::config::WorkerConfig;

use crate::shutdown::ShutdownToken;

/// How long output forwarders get to drain after the child has exited.
const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// A long-running background job the controller starts and stops.
///
/// `start` must return once the job is initialized and keep it running in
/// the background. `close` blocks until the instance has released its
/// resources and must be safe to call more than once on the same instance.
/// Neither reports failure: implementations log their own errors.
#[trait_variant::make(Worker: Send)]
pub trait LocalWorker {
    type Instance: Send;

    async fn start(&mut self, shutdown: ShutdownToken) -> Self::Instance;

    async fn close(&mut self, instance: &mut Self::Instance);
}

// ---------------------------------------------------------------------------
// ProcessWorker
// ---------------------------------------------------------------------------

/// Runs a configured command as a supervised child process.
///
/// Stopping closes the child's stdin, waits up to `stop_timeout` for it to
/// exit, then kills it. Child stdout/stderr lines are forwarded to `tracing`.
#[derive(Debug, Clone)]
pub struct ProcessWorker {
    program: String,
    args: Vec<String>,
    stop_timeout: Duration,
    started: u64,
}

impl ProcessWorker {
    pub fn new(program: impl Into<String>, args: Vec<String>, stop_timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            stop_timeout,
            started: 0,
        }
    }

    pub fn from_config(config: &WorkerConfig) -> Self {
        let mut command = config.command.iter().cloned();
        let program = command.next().unwrap_or_default();
        Self::new(program, command.collect(), config.stop_timeout())
    }
}

/// One started child process. Each start yields a fresh id.
#[derive(Debug)]
pub struct ProcessInstance {
    id: u64,
    pid: Option<u32>,
    stop: Option<oneshot::Sender<()>>,
    supervisor: Option<JoinHandle<()>>,
}

impl ProcessInstance {
    fn inert(id: u64) -> Self {
        Self {
            id,
            pid: None,
            stop: None,
            supervisor: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Whether `close` has run (or the spawn failed and there was nothing to run).
    pub fn is_closed(&self) -> bool {
        self.supervisor.is_none()
    }
}

impl Worker for ProcessWorker {
    type Instance = ProcessInstance;

    async fn start(&mut self, shutdown: ShutdownToken) -> ProcessInstance {
        self.started += 1;
        let id = self.started;

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = match command.spawn() {
            Ok(child) => child,
            Err(err) => {
                tracing::error!(instance = id, program = %self.program, error = %err, "failed to start worker");
                return ProcessInstance::inert(id);
            }
        };

        let pid = child.id();
        tracing::info!(instance = id, pid = ?pid, program = %self.program, "worker started");

        let (stop_tx, stop_rx) = oneshot::channel();
        let supervisor = tokio::spawn(supervise(id, child, stop_rx, shutdown, self.stop_timeout));

        ProcessInstance {
            id,
            pid,
            stop: Some(stop_tx),
            supervisor: Some(supervisor),
        }
    }

    async fn close(&mut self, instance: &mut ProcessInstance) {
        if let Some(stop) = instance.stop.take() {
            let _ = stop.send(());
        }
        let Some(supervisor) = instance.supervisor.take() else {
            return;
        };
        if let Err(err) = supervisor.await {
            tracing::error!(instance = instance.id, error = %err, "worker supervisor failed");
        }
        tracing::info!(instance = instance.id, "worker closed");
    }
}

async fn supervise(
    id: u64,
    mut child: Child,
    mut stop_rx: oneshot::Receiver<()>,
    shutdown: ShutdownToken,
    stop_timeout: Duration,
) {
    let stdin = child.stdin.take();
    let forwarders = forward_output(id, &mut child);

    let reason = tokio::select! {
        status = child.wait() => {
            match status {
                Ok(status) => tracing::warn!(instance = id, %status, "worker exited on its own"),
                Err(err) => tracing::error!(instance = id, error = %err, "failed to wait on worker"),
            }
            None
        }
        // A dropped instance stops its child too.
        _ = &mut stop_rx => Some("close requested"),
        _ = shutdown.cancelled() => Some("process shutdown"),
    };

    if let Some(reason) = reason {
        stop_child(id, &mut child, stdin, stop_timeout, reason).await;
    }

    for forwarder in forwarders {
        let _ = tokio::time::timeout(OUTPUT_DRAIN_TIMEOUT, forwarder).await;
    }
}

async fn stop_child(
    id: u64,
    child: &mut Child,
    stdin: Option<ChildStdin>,
    stop_timeout: Duration,
    reason: &'static str,
) {
    tracing::debug!(instance = id, reason, "stopping worker");
    drop(stdin);

    match tokio::time::timeout(stop_timeout, child.wait()).await {
        Ok(Ok(status)) => tracing::info!(instance = id, %status, "worker exited"),
        Ok(Err(err)) => tracing::error!(instance = id, error = %err, "failed to wait on worker"),
        Err(_) => {
            tracing::warn!(
                instance = id,
                timeout_ms = u64::try_from(stop_timeout.as_millis()).unwrap_or(u64::MAX),
                "worker did not exit in time; killing",
            );
            if let Err(err) = child.kill().await {
                tracing::error!(instance = id, error = %err, "failed to kill worker");
            }
        }
    }
}

fn forward_output(id: u64, child: &mut Child) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        handles.push(tokio::spawn(forward_lines(id, "stdout", stdout)));
    }
    if let Some(stderr) = child.stderr.take() {
        handles.push(tokio::spawn(forward_lines(id, "stderr", stderr)));
    }
    handles
}

async fn forward_lines<R>(id: u64, stream: &'static str, reader: R)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => tracing::info!(instance = id, stream, "{line}"),
            Ok(None) => break,
            Err(err) => {
                tracing::warn!(instance = id, stream, error = %err, "worker output read failed");
                break;
            }
        }
    }
}
