//! Per-stage registry of cleanup callbacks.
//!
//! # Responsibilities
//! - Accept cleanups from concurrently finishing init tasks
//! - Keep them ordered by the registering task's position in the stage
//! - Hand them out exactly once for teardown
//!
//! # Design Decisions
//! - Appends go through a mutex; reads happen only after fan-in
//! - `drain()` empties the registry, a second teardown finds nothing to run

use std::sync::{Mutex, PoisonError};

use crate::lifecycle::task::CleanupTask;

/// A cleanup together with the init task that registered it.
#[derive(Debug)]
pub struct CleanupEntry {
    /// Position of the registering task within its stage.
    pub index: usize,
    /// Name of the registering task.
    pub task: String,
    pub cleanup: CleanupTask,
}

/// Concurrency-safe collection of cleanups for one stage.
#[derive(Debug, Default)]
pub struct CleanupRegistry {
    entries: Mutex<Vec<CleanupEntry>>,
}

impl CleanupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the cleanup produced by task `index`.
    ///
    /// Entries stay sorted by `index`, so the resulting order does not depend
    /// on which task finished first.
    pub fn register(&self, index: usize, task: impl Into<String>, cleanup: CleanupTask) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let pos = entries.partition_point(|e| e.index < index);
        entries.insert(
            pos,
            CleanupEntry {
                index,
                task: task.into(),
                cleanup,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of the registering tasks, in registration order.
    pub fn task_names(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|e| e.task.clone())
            .collect()
    }

    /// Take every entry out of the registry.
    pub fn drain(&self) -> Vec<CleanupEntry> {
        std::mem::take(&mut *self.entries.lock().unwrap_or_else(PoisonError::into_inner))
    }
}
