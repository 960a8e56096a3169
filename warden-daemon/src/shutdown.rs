//! Process-wide shutdown signal.
//!
//! One [`ShutdownSource`] exists per process. Its [`ShutdownToken`]s are
//! handed to the controller at construction and from there to every worker
//! start; pausing and continuing the worker never touches them.

use tokio::sync::watch;

/// Triggers process-wide shutdown. Cancellation happens at most once.
#[derive(Debug)]
pub struct ShutdownSource {
    tx: watch::Sender<bool>,
}

impl ShutdownSource {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    pub fn token(&self) -> ShutdownToken {
        ShutdownToken {
            rx: self.tx.subscribe(),
        }
    }

    /// Cancel every token. Returns `true` only for the call that actually
    /// flipped the signal.
    pub fn cancel(&self) -> bool {
        self.tx.send_if_modified(|cancelled| {
            if *cancelled {
                false
            } else {
                *cancelled = true;
                true
            }
        })
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for ShutdownSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable view of the shutdown signal.
#[derive(Debug, Clone)]
pub struct ShutdownToken {
    rx: watch::Receiver<bool>,
}

impl ShutdownToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once shutdown has been requested.
    ///
    /// If the source is dropped without cancelling, this never resolves.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn cancel_takes_effect_once() {
        let source = ShutdownSource::new();
        let token = source.token();
        assert!(!token.is_cancelled());

        assert!(source.cancel());
        assert!(!source.cancel(), "second cancel is a no-op");
        assert!(token.is_cancelled());
        assert!(source.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_resolves_for_every_clone() {
        let source = ShutdownSource::new();
        let first = source.token();
        let second = first.clone();

        let waiter = tokio::spawn(async move { second.cancelled().await });
        source.cancel();

        first.cancelled().await;
        waiter.await.expect("waiter task");
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_source_never_cancels() {
        let source = ShutdownSource::new();
        let token = source.token();
        drop(source);

        let waited = tokio::time::timeout(Duration::from_secs(60), token.cancelled()).await;
        assert!(waited.is_err(), "a dropped source is not a cancellation");
    }
}
