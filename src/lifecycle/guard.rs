//! Panic containment for task invocations.
//!
//! Each task runs on its own tokio task. A panic unwinds only that task and
//! surfaces as a `JoinError`, which is turned into
//! [`LifecycleError::Panic`] carrying the task name.

use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::future::Future;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::{JoinError, JoinHandle};

use crate::lifecycle::error::{LifecycleError, TaskPhase};
use crate::observability::metrics;

/// Sending half of a phase's failure channel.
pub type FailureSender = mpsc::Sender<LifecycleError>;

/// Frames kept from a captured backtrace.
const STACK_FRAMES: usize = 6;

/// Run `fut` as an independent unit so a panic cannot escape into the caller.
pub(crate) fn spawn_guarded<F>(fut: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::spawn(fut)
}

/// Convert a failed join into a named lifecycle error.
pub(crate) fn recover(task: &str, err: JoinError) -> LifecycleError {
    let message = if err.is_panic() {
        panic_message(err.into_panic())
    } else {
        "task was aborted".to_string()
    };
    LifecycleError::Panic {
        task: task.to_string(),
        message,
        stack: stack_summary(),
    }
}

/// Log a task failure and hand it to the phase's failure channel.
///
/// Never blocks. When the channel is already full an earlier failure owns the
/// outcome and this one is only logged.
pub(crate) fn report(failures: &FailureSender, phase: TaskPhase, err: LifecycleError) {
    tracing::error!(
        phase = %phase,
        task = err.task_name().unwrap_or("-"),
        kind = err.kind(),
        error = %err,
        "Task failed"
    );
    if let LifecycleError::Panic { stack, .. } = &err {
        if !stack.is_empty() {
            tracing::debug!(stack = %stack, "Recovered panic backtrace");
        }
    }
    metrics::record_task_failure(phase, err.kind());

    match failures.try_send(err) {
        Ok(()) => {}
        Err(TrySendError::Full(err)) => {
            tracing::warn!(phase = %phase, error = %err, "Failure superseded by an earlier one");
        }
        Err(TrySendError::Closed(err)) => {
            tracing::debug!(phase = %phase, error = %err, "Failure reported after the phase ended");
        }
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Leading frames of the backtrace at the recovery point.
///
/// Empty unless backtraces are enabled through `RUST_BACKTRACE`.
fn stack_summary() -> String {
    let backtrace = Backtrace::capture();
    if backtrace.status() != BacktraceStatus::Captured {
        return String::new();
    }
    backtrace
        .to_string()
        .lines()
        .take(STACK_FRAMES * 2)
        .collect::<Vec<_>>()
        .join("\n")
}
