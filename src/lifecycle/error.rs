//! Lifecycle error taxonomy.

use std::time::Duration;
use thiserror::Error;

/// Error type returned by user tasks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Phase a failure was observed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskPhase {
    Init,
    Daemon,
    Cleanup,
}

impl TaskPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPhase::Init => "init",
            TaskPhase::Daemon => "daemon",
            TaskPhase::Cleanup => "cleanup",
        }
    }
}

impl std::fmt::Display for TaskPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced while driving the application lifecycle.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// A task returned an error.
    #[error("{task}(): {source}")]
    Task {
        task: String,
        #[source]
        source: BoxError,
    },

    /// A task panicked. The panic was contained and re-framed as an error.
    #[error("{task}() panic: {message}")]
    Panic {
        task: String,
        message: String,
        /// Leading frames of the backtrace captured at recovery time.
        stack: String,
    },

    /// A phase deadline elapsed before the phase completed.
    #[error("{phase} timed out after {after:?}")]
    Timeout { phase: TaskPhase, after: Duration },
}

impl LifecycleError {
    /// Wrap an error returned by the named task.
    pub fn task(task: impl Into<String>, source: impl Into<BoxError>) -> Self {
        LifecycleError::Task {
            task: task.into(),
            source: source.into(),
        }
    }

    /// Name of the failing task, when the error is tied to one.
    pub fn task_name(&self) -> Option<&str> {
        match self {
            LifecycleError::Task { task, .. } | LifecycleError::Panic { task, .. } => Some(task),
            LifecycleError::Timeout { .. } => None,
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            LifecycleError::Task { .. } => "error",
            LifecycleError::Panic { .. } => "panic",
            LifecycleError::Timeout { .. } => "timeout",
        }
    }

    pub fn is_panic(&self) -> bool {
        matches!(self, LifecycleError::Panic { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, LifecycleError::Timeout { .. })
    }
}
