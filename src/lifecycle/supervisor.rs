//! Daemon supervision for the run phase.
//!
//! # Data Flow
//! ```text
//! launch all daemons under one shared lifetime
//!     → wait on: stop request | daemon failure | all done | forced-close deadline
//!     → first stop or failure: cancel lifetime, arm forced-close deadline
//!     → all done or deadline: return (failure if one started the shutdown)
//! ```
//!
//! # Design Decisions
//! - Exactly one of {stop request, daemon failure} starts the shutdown
//! - After that, further stops and failures are ignored (no escalation)
//! - Daemons still running at the deadline are abandoned, not aborted

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::mpsc;
use tokio::time::{self, Instant};

use crate::lifecycle::error::{LifecycleError, TaskPhase};
use crate::lifecycle::guard;
use crate::lifecycle::lifetime::Lifetime;
use crate::lifecycle::signals::{StopReceiver, StopRequest};
use crate::lifecycle::task::DaemonTask;
use crate::observability::metrics;

/// How a supervision run ended.
#[derive(Debug)]
pub enum Exit {
    /// Every daemon returned before any stop or failure.
    Completed,
    /// A stop request started the shutdown.
    Stopped { request: StopRequest, forced: bool },
    /// A daemon failure started the shutdown.
    Failed { error: LifecycleError, forced: bool },
}

impl Exit {
    /// Collapse into the phase result: only daemon failures are errors.
    pub fn into_result(self) -> Result<(), LifecycleError> {
        match self {
            Exit::Failed { error, .. } => Err(error),
            Exit::Completed | Exit::Stopped { .. } => Ok(()),
        }
    }

    /// True when daemons were abandoned at the forced-close deadline.
    pub fn forced(&self) -> bool {
        match self {
            Exit::Completed => false,
            Exit::Stopped { forced, .. } | Exit::Failed { forced, .. } => *forced,
        }
    }
}

enum Trigger {
    Stop(StopRequest),
    Failure(LifecycleError),
}

/// Runs all daemons concurrently and enforces the forced-close deadline.
#[derive(Debug)]
pub struct DaemonSupervisor {
    daemons: Vec<DaemonTask>,
    forced_close_timeout: Duration,
}

impl DaemonSupervisor {
    pub fn new(daemons: Vec<DaemonTask>, forced_close_timeout: Duration) -> Self {
        Self {
            daemons,
            forced_close_timeout,
        }
    }

    /// Supervise until all daemons exit, or a stop/failure plus grace period.
    pub async fn run(self, parent: &Lifetime, stops: &mut StopReceiver) -> Exit {
        let lifetime = parent.child();
        let count = self.daemons.len();
        let (failure_tx, mut failures) = mpsc::channel(count.max(1));
        let running = Arc::new(AtomicUsize::new(count));
        metrics::set_daemons_running(count);

        let waits: Vec<_> = self
            .daemons
            .into_iter()
            .map(|daemon| {
                let (name, func) = daemon.into_parts();
                let child = lifetime.clone();
                let failure_tx = failure_tx.clone();
                let running = running.clone();
                let task_name = name.clone();

                let handle = guard::spawn_guarded(async move {
                    tracing::trace!(daemon = %task_name, "Daemon running");
                    func(child)
                        .await
                        .map_err(|source| LifecycleError::task(task_name, source))
                });

                async move {
                    let result = match handle.await {
                        Ok(result) => result,
                        Err(join_err) => Err(guard::recover(&name, join_err)),
                    };
                    match result {
                        Ok(()) => tracing::trace!(daemon = %name, "Daemon done"),
                        Err(err) => guard::report(&failure_tx, TaskPhase::Daemon, err),
                    }
                    let left = running.fetch_sub(1, Ordering::AcqRel) - 1;
                    metrics::set_daemons_running(left);
                }
            })
            .collect();
        drop(failure_tx);

        // Completion signal: fires once every daemon has returned.
        let mut all_done = tokio::spawn(async move {
            join_all(waits).await;
        });

        let mut listening = true;
        let mut trigger: Option<Trigger> = None;
        let mut close_deadline: Option<Instant> = None;

        loop {
            tokio::select! {
                biased;

                Some(err) = failures.recv(), if trigger.is_none() => {
                    tracing::error!(
                        error = %err,
                        timeout = ?self.forced_close_timeout,
                        "Daemon failed, shutting down"
                    );
                    lifetime.cancel();
                    trigger = Some(Trigger::Failure(err));
                    listening = false;
                    close_deadline = Some(Instant::now() + self.forced_close_timeout);
                }
                request = stops.recv(), if listening => {
                    listening = false;
                    if let Some(request) = request {
                        tracing::info!(
                            source = %request.source,
                            timeout = ?self.forced_close_timeout,
                            "Stop requested, shutting down"
                        );
                        metrics::record_stop_request(&request.source);
                        lifetime.cancel();
                        trigger = Some(Trigger::Stop(request));
                        close_deadline = Some(Instant::now() + self.forced_close_timeout);
                    }
                }
                _ = &mut all_done => {
                    tracing::trace!("All daemons done");
                    return finish(trigger, false);
                }
                _ = sleep_until(close_deadline) => {
                    let left = running.load(Ordering::Acquire);
                    tracing::warn!(
                        abandoned = left,
                        timeout = ?self.forced_close_timeout,
                        "Daemons did not exit in time, giving up"
                    );
                    return finish(trigger, true);
                }
            }
        }
    }
}

fn finish(trigger: Option<Trigger>, forced: bool) -> Exit {
    match trigger {
        None => Exit::Completed,
        Some(Trigger::Stop(request)) => Exit::Stopped { request, forced },
        Some(Trigger::Failure(error)) => Exit::Failed { error, forced },
    }
}

/// Sleep until `deadline`; pending forever while unarmed.
fn sleep_until(deadline: Option<Instant>) -> impl Future<Output = ()> {
    async move {
        match deadline {
            Some(deadline) => time::sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    }
}
