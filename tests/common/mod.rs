//! Shared utilities for lifecycle integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use stagehand::config::LifecycleConfig;
use stagehand::lifecycle::{CleanupTask, DaemonTask, InitTask, Lifetime};

/// Ordered record of what the tasks under test did.
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<String>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.events().iter().filter(|e| e.as_str() == event).count()
    }

    pub fn contains(&self, event: &str) -> bool {
        self.count(event) > 0
    }

    pub fn position(&self, event: &str) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }
}

/// Lifecycle settings for tests: no signal handling, short grace periods.
pub fn test_config() -> LifecycleConfig {
    LifecycleConfig {
        init_timeout_ms: 0,
        cleanup_timeout_ms: 1000,
        forced_close_timeout_ms: 200,
        init_abort_window_ms: 200,
        handle_signals: false,
    }
}

/// Init task that logs "init:<name>" and registers a cleanup logging "clean:<name>".
pub fn init_with_cleanup(log: &EventLog, name: &str) -> InitTask {
    let log = log.clone();
    let task = name.to_string();
    InitTask::new(name, move |_lifetime: Lifetime| async move {
        log.push(format!("init:{task}"));
        Ok::<_, std::io::Error>(Some(CleanupTask::new(move |_| async move {
            log.push(format!("clean:{task}"));
        })))
    })
}

/// Init task that logs "init:<name>" and registers nothing.
pub fn init_ok(log: &EventLog, name: &str) -> InitTask {
    let log = log.clone();
    let task = name.to_string();
    InitTask::new(name, move |_lifetime: Lifetime| async move {
        log.push(format!("init:{task}"));
        Ok::<_, std::io::Error>(None)
    })
}

/// Init task that fails with `message`.
pub fn init_failing(name: &str, message: &'static str) -> InitTask {
    InitTask::new(name, move |_lifetime: Lifetime| async move {
        Err::<Option<CleanupTask>, _>(std::io::Error::other(message))
    })
}

/// Init task that panics with `message`.
pub fn init_panicking(name: &str, message: &'static str) -> InitTask {
    InitTask::new(name, move |_lifetime: Lifetime| async move {
        if !message.is_empty() {
            panic!("{}", message);
        }
        Ok::<_, std::io::Error>(None)
    })
}

/// Init task that sleeps for `delay` without looking at its lifetime.
pub fn init_slow(log: &EventLog, name: &str, delay: Duration) -> InitTask {
    let log = log.clone();
    let task = name.to_string();
    InitTask::new(name, move |_lifetime: Lifetime| async move {
        tokio::time::sleep(delay).await;
        log.push(format!("init:{task}"));
        Ok::<_, std::io::Error>(None)
    })
}

/// Daemon that runs until cancelled, logging "start:<name>" and "stop:<name>".
pub fn daemon_until_cancelled(log: &EventLog, name: &str) -> DaemonTask {
    let log = log.clone();
    let task = name.to_string();
    DaemonTask::new(name, move |lifetime: Lifetime| async move {
        log.push(format!("start:{task}"));
        lifetime.cancelled().await;
        log.push(format!("stop:{task}"));
        Ok::<_, std::io::Error>(())
    })
}

/// Daemon that fails with `message` after `delay`.
pub fn daemon_failing(name: &str, delay: Duration, message: &'static str) -> DaemonTask {
    DaemonTask::new(name, move |_lifetime: Lifetime| async move {
        tokio::time::sleep(delay).await;
        Err::<(), _>(std::io::Error::other(message))
    })
}

/// Daemon that panics with `message` after `delay`.
pub fn daemon_panicking(name: &str, delay: Duration, message: &'static str) -> DaemonTask {
    DaemonTask::new(name, move |_lifetime: Lifetime| async move {
        tokio::time::sleep(delay).await;
        if !message.is_empty() {
            panic!("{}", message);
        }
        Ok::<_, std::io::Error>(())
    })
}

/// Daemon that ignores cancellation for `hold`.
pub fn daemon_straggler(log: &EventLog, name: &str, hold: Duration) -> DaemonTask {
    let log = log.clone();
    let task = name.to_string();
    DaemonTask::new(name, move |_lifetime: Lifetime| async move {
        log.push(format!("start:{task}"));
        tokio::time::sleep(hold).await;
        log.push(format!("stop:{task}"));
        Ok::<_, std::io::Error>(())
    })
}
