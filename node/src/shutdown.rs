//! Stopping the authority between ticks.
//!
//! The stop notice is held in a `tokio::sync::watch` channel, so a task
//! that subscribes after the stop was requested still sees it. The first
//! reason recorded wins. Pending votes and consensuses are discarded on
//! exit; the next start begins a fresh period.

use std::fmt;

use tokio::signal;
use tokio::sync::watch;

/// What ended the run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    Interrupt,
    Terminate,
    /// Requested from inside the process, or the controller went away.
    Requested,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StopReason::Interrupt => "SIGINT",
            StopReason::Terminate => "SIGTERM",
            StopReason::Requested => "stop request",
        })
    }
}

/// Owner of the stop notice. The daemon's tick loop and the metrics
/// endpoint each hold a [`StopListener`] from [`ShutdownController::subscribe`].
pub struct ShutdownController {
    tx: watch::Sender<Option<StopReason>>,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    pub fn subscribe(&self) -> StopListener {
        StopListener {
            rx: self.tx.subscribe(),
        }
    }

    /// Record `reason` unless a stop is already under way.
    pub fn shutdown(&self, reason: StopReason) {
        let first = self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        });
        if first {
            tracing::info!(%reason, "stopping the authority");
        }
    }

    /// The recorded reason, once a stop was requested.
    pub fn reason(&self) -> Option<StopReason> {
        *self.tx.borrow()
    }

    /// Wait for SIGINT or SIGTERM and record it.
    pub async fn wait_for_signal(&self) {
        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "couldn't install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        let reason = tokio::select! {
            _ = signal::ctrl_c() => StopReason::Interrupt,
            _ = terminate => StopReason::Terminate,
        };
        self.shutdown(reason);
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

/// One task's view of the stop notice.
#[derive(Clone)]
pub struct StopListener {
    rx: watch::Receiver<Option<StopReason>>,
}

impl StopListener {
    /// Resolve once a stop is recorded. A dropped controller counts as a
    /// request to stop.
    pub async fn stopped(&mut self) -> StopReason {
        match self.rx.wait_for(Option::is_some).await {
            Ok(reason) => (*reason).unwrap_or(StopReason::Requested),
            Err(_) => StopReason::Requested,
        }
    }

    pub fn is_stopping(&self) -> bool {
        self.rx.borrow().is_some()
    }
}
