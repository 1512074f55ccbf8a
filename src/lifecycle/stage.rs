//! Init stages and the runner that executes them.
//!
//! # Responsibilities
//! - Fan out every init task of a stage concurrently
//! - Contain panics and name the failing task
//! - Collect cleanups from successful tasks
//! - Run collected cleanups during teardown
//!
//! # Design Decisions
//! - Failures go to the orchestrator's channel, never returned directly, so
//!   the first one can be acted on while siblings are still running
//! - `run` always waits for full fan-in before returning
//! - Cleanups are registered from inside each task, so a straggler never
//!   delays a sibling's registration

use std::sync::Arc;

use futures_util::future::join_all;

use crate::lifecycle::cleanup::CleanupRegistry;
use crate::lifecycle::error::{LifecycleError, TaskPhase};
use crate::lifecycle::guard::{self, FailureSender};
use crate::lifecycle::lifetime::Lifetime;
use crate::lifecycle::task::InitTask;
use crate::observability::metrics;

/// A named group of init tasks executed concurrently as a unit.
#[derive(Debug)]
pub struct Stage {
    name: String,
    tasks: Option<Vec<InitTask>>,
    cleanups: Arc<CleanupRegistry>,
}

/// Counts reported by a finished [`StageRunner`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageOutcome {
    pub succeeded: usize,
    pub failed: usize,
}

impl Stage {
    pub fn new(name: impl Into<String>, tasks: Vec<InitTask>) -> Self {
        Self {
            name: name.into(),
            tasks: Some(tasks),
            cleanups: Arc::new(CleanupRegistry::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of tasks not yet handed to a runner.
    pub fn pending_tasks(&self) -> usize {
        self.tasks.as_ref().map_or(0, Vec::len)
    }

    pub fn cleanups(&self) -> &Arc<CleanupRegistry> {
        &self.cleanups
    }

    /// Take the runner for this stage. Returns `None` once it has been taken.
    pub fn runner(&mut self, failures: FailureSender) -> Option<StageRunner> {
        let tasks = self.tasks.take()?;
        Some(StageRunner {
            stage: self.name.clone(),
            tasks,
            cleanups: self.cleanups.clone(),
            failures,
        })
    }

    /// Run every registered cleanup concurrently.
    ///
    /// Panics are logged and swallowed. Returns when all cleanups finish or
    /// `lifetime` ends, whichever comes first. Returns the number of cleanups
    /// launched.
    pub async fn clean(&mut self, lifetime: &Lifetime) -> usize {
        let entries = self.cleanups.drain();
        if entries.is_empty() {
            tracing::trace!(stage = %self.name, "Nothing to clean");
            return 0;
        }
        let launched = entries.len();

        // Launch in reverse registration order; completion order is free.
        let waits = entries.into_iter().rev().map(|entry| {
            let task = entry.task;
            let cleanup = entry.cleanup.into_fn();
            let child = lifetime.clone();
            tracing::trace!(stage = %self.name, task = %task, "Cleaning");
            let handle = guard::spawn_guarded(async move { cleanup(child).await });
            async move {
                match handle.await {
                    Ok(()) => tracing::trace!(task = %task, "Cleanup done"),
                    Err(join_err) => {
                        let err = guard::recover(&task, join_err);
                        tracing::error!(task = %task, error = %err, "Cleanup panicked");
                        metrics::record_task_failure(TaskPhase::Cleanup, err.kind());
                    }
                }
            }
        });

        tokio::select! {
            _ = join_all(waits) => {}
            reason = lifetime.cancelled() => {
                tracing::warn!(stage = %self.name, reason = ?reason, "Cleanup interrupted");
            }
        }
        launched
    }
}

/// Single-use executor for one stage's init tasks.
#[derive(Debug)]
pub struct StageRunner {
    stage: String,
    tasks: Vec<InitTask>,
    cleanups: Arc<CleanupRegistry>,
    failures: FailureSender,
}

impl StageRunner {
    /// Run all tasks concurrently and wait for every one of them to finish.
    pub async fn run(self, lifetime: Lifetime) -> StageOutcome {
        let stage = self.stage;

        let waits = self.tasks.into_iter().enumerate().map(|(index, task)| {
            let (name, func) = task.into_parts();
            let registry = self.cleanups.clone();
            let failures = self.failures.clone();
            let lifetime = lifetime.clone();
            let task_name = name.clone();
            let stage = stage.clone();

            let handle = guard::spawn_guarded(async move {
                tracing::trace!(stage = %stage, task = %task_name, "Init task started");
                match func(lifetime).await {
                    Ok(cleanup) => {
                        if let Some(cleanup) = cleanup {
                            registry.register(index, task_name.as_str(), cleanup);
                        }
                        tracing::trace!(stage = %stage, task = %task_name, "Init task done");
                        Ok(())
                    }
                    Err(source) => Err(LifecycleError::task(task_name, source)),
                }
            });

            async move {
                let result = match handle.await {
                    Ok(result) => result,
                    Err(join_err) => Err(guard::recover(&name, join_err)),
                };
                match result {
                    Ok(()) => true,
                    Err(err) => {
                        guard::report(&failures, TaskPhase::Init, err);
                        false
                    }
                }
            }
        });

        let results = join_all(waits).await;
        let succeeded = results.iter().filter(|ok| **ok).count();
        StageOutcome {
            succeeded,
            failed: results.len() - succeeded,
        }
    }
}
