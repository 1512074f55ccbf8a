//! External stop requests.
//!
//! # Responsibilities
//! - Provide a handle anything can use to request a graceful stop
//! - Translate SIGINT/SIGTERM into stop requests
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Repeated signals are forwarded as-is; the supervisor acts on the first
//!   one only, later requests do not escalate

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A recognized termination request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopRequest {
    /// Where the request came from, e.g. `SIGTERM`.
    pub source: String,
}

/// Cloneable handle used to request a graceful stop of the run phase.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: mpsc::UnboundedSender<StopRequest>,
}

/// Receiving side of the stop channel.
pub type StopReceiver = mpsc::UnboundedReceiver<StopRequest>;

impl StopHandle {
    /// Create a connected handle and receiver.
    pub fn channel() -> (Self, StopReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Request a stop. Returns false when nobody is listening any more.
    pub fn request_stop(&self, source: impl Into<String>) -> bool {
        self.tx
            .send(StopRequest {
                source: source.into(),
            })
            .is_ok()
    }
}

/// Wait for the next termination signal and return its name.
#[cfg(unix)]
pub async fn wait_for_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = interrupt.recv() => Ok("SIGINT"),
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

/// Wait for the next termination signal and return its name.
#[cfg(not(unix))]
pub async fn wait_for_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}

/// Forward OS termination signals into `handle` until the receiver is gone.
pub(crate) fn forward_signals(handle: StopHandle) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match wait_for_signal().await {
                Ok(name) => {
                    tracing::debug!(signal = name, "Termination signal received");
                    if !handle.request_stop(name) {
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to install signal handlers");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stop_handle_delivers_requests() {
        let (handle, mut rx) = StopHandle::channel();
        let other = handle.clone();

        assert!(handle.request_stop("test"));
        assert!(other.request_stop("again"));

        assert_eq!(rx.recv().await.unwrap().source, "test");
        assert_eq!(rx.recv().await.unwrap().source, "again");
    }

    #[test]
    fn test_request_after_receiver_dropped() {
        let (handle, rx) = StopHandle::channel();
        drop(rx);
        assert!(!handle.request_stop("late"));
    }
}
