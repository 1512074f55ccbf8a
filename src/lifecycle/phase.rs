//! Application phase tracking.
//!
//! ```text
//! NotStarted → Initializing → Running → CleaningUp → Terminated
//!                   │            │
//!                   └── failed ──┘   (flag, teardown still runs)
//! ```

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

/// Lifecycle phase of an application.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    NotStarted = 0,
    Initializing = 1,
    Running = 2,
    CleaningUp = 3,
    Terminated = 4,
}

impl From<u8> for Phase {
    fn from(val: u8) -> Self {
        match val {
            1 => Phase::Initializing,
            2 => Phase::Running,
            3 => Phase::CleaningUp,
            4 => Phase::Terminated,
            _ => Phase::NotStarted,
        }
    }
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::NotStarted => "not_started",
            Phase::Initializing => "initializing",
            Phase::Running => "running",
            Phase::CleaningUp => "cleaning_up",
            Phase::Terminated => "terminated",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Default)]
struct PhaseState {
    phase: AtomicU8,
    failed: AtomicBool,
}

/// Shared, read-anywhere view of the current phase.
///
/// Only the application advances it; clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct PhaseCell {
    inner: Arc<PhaseState>,
}

impl PhaseCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Phase {
        Phase::from(self.inner.phase.load(Ordering::Acquire))
    }

    /// True once init or a daemon failed.
    pub fn failed(&self) -> bool {
        self.inner.failed.load(Ordering::Acquire)
    }

    /// Move forward to `next`. Phases never go backwards.
    pub(crate) fn advance(&self, next: Phase) -> bool {
        let prev = self.inner.phase.fetch_max(next as u8, Ordering::AcqRel);
        let moved = prev < next as u8;
        if moved {
            tracing::debug!(from = %Phase::from(prev), to = %next, "Phase transition");
        }
        moved
    }

    /// Enter the failed sub-state. Only meaningful while initializing or running.
    pub(crate) fn mark_failed(&self) {
        if matches!(self.get(), Phase::Initializing | Phase::Running) {
            self.inner.failed.store(true, Ordering::Release);
        }
    }
}
