//! Lifetime handle passed to every task.
//!
//! # Responsibilities
//! - Carry the cancellation signal for one lifecycle phase
//! - Carry the optional phase deadline
//! - Let tasks wait for "cancelled or expired" in one call
//!
//! # Design Decisions
//! - Cancellation is cooperative: nothing is preempted
//! - Deadline expiry is observed lazily, the orchestrator cancels explicitly
//!   once it notices the deadline so token waiters wake up too

use std::time::Duration;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

/// Why a lifetime ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// `cancel()` was called on this lifetime or a parent.
    Cancelled,
    /// The deadline passed.
    DeadlineExceeded,
}

/// Cancellable, optionally time-bounded scope shared by the tasks of a phase.
#[derive(Debug, Clone)]
pub struct Lifetime {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Lifetime {
    /// Unbounded lifetime that only ends on cancellation.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    /// Lifetime ending after `timeout`. A zero timeout means unbounded.
    pub fn with_timeout(timeout: Duration) -> Self {
        let deadline = (!timeout.is_zero()).then(|| Instant::now() + timeout);
        Self {
            token: CancellationToken::new(),
            deadline,
        }
    }

    /// Derive a lifetime cancelled together with this one.
    ///
    /// Cancelling the child does not affect the parent. The child inherits
    /// the parent's deadline.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Cancel this lifetime and every child derived from it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// True once cancelled or past the deadline.
    pub fn is_cancelled(&self) -> bool {
        self.end_reason().is_some()
    }

    /// Deadline of this lifetime, if bounded.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `None` when unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Why the lifetime ended, or `None` while it is still live.
    pub fn end_reason(&self) -> Option<EndReason> {
        if self.token.is_cancelled() {
            return Some(EndReason::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(EndReason::DeadlineExceeded),
            _ => None,
        }
    }

    /// Wait until the lifetime is cancelled or its deadline passes.
    pub async fn cancelled(&self) -> EndReason {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => EndReason::Cancelled,
                    _ = time::sleep_until(deadline) => EndReason::DeadlineExceeded,
                }
            }
            None => {
                self.token.cancelled().await;
                EndReason::Cancelled
            }
        }
    }

    /// Wait only for the deadline. Pending forever when unbounded.
    pub async fn expired(&self) {
        match self.deadline {
            Some(deadline) => time::sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    }
}

impl Default for Lifetime {
    fn default() -> Self {
        Self::new()
    }
}
