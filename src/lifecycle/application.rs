//! The application: staged init, supervised run, reverse-order teardown.
//!
//! # Data Flow
//! ```text
//! start()
//!     → init stages, strictly in addition order
//!         first failure / panic / init timeout → cancel, let the stage settle, abort
//!     → daemons under the supervisor (only if init fully succeeded)
//!     → cleanup of every entered stage, in reverse order, bounded by the cleanup timeout
//! ```
//!
//! # Design Decisions
//! - `start` consumes the application: one init, one run, one teardown
//! - A stage counts as entered once its runner is launched, even if it fails
//!   partway; cleanups its successful tasks registered still run
//! - Teardown never fails the shutdown path; problems are logged

use std::time::Instant;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::sync::mpsc;
use tracing::Instrument;

use crate::config::LifecycleConfig;
use crate::lifecycle::error::{LifecycleError, TaskPhase};
use crate::lifecycle::guard;
use crate::lifecycle::lifetime::Lifetime;
use crate::lifecycle::phase::{Phase, PhaseCell};
use crate::lifecycle::signals::{self, StopHandle, StopReceiver};
use crate::lifecycle::stage::Stage;
use crate::lifecycle::supervisor::{DaemonSupervisor, Exit};
use crate::lifecycle::task::{DaemonTask, InitTask};
use crate::observability::metrics;

/// Name of the config change listener in diagnostics.
const CONFIG_LISTENER: &str = "config-changed";

type ConfigListener = Box<dyn FnOnce(Lifetime) -> BoxFuture<'static, ()> + Send>;

/// A process lifecycle: init stages, daemons, teardown.
pub struct Application {
    name: String,
    config: LifecycleConfig,
    stages: Vec<Stage>,
    daemons: Vec<DaemonTask>,
    config_listener: Option<ConfigListener>,
    phase: PhaseCell,
    stop_handle: StopHandle,
    stops: StopReceiver,
}

enum StageEvent {
    Completed,
    Aborted { error: LifecycleError, settled: bool },
}

impl Application {
    /// Create an application with explicit lifecycle settings.
    pub fn new(name: impl Into<String>, config: LifecycleConfig) -> Self {
        let (stop_handle, stops) = StopHandle::channel();
        Self {
            name: name.into(),
            config,
            stages: Vec::new(),
            daemons: Vec::new(),
            config_listener: None,
            phase: PhaseCell::new(),
            stop_handle,
            stops,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append an init stage. Stages run in the order they are added.
    pub fn add_init_stage(
        mut self,
        name: impl Into<String>,
        tasks: impl IntoIterator<Item = InitTask>,
    ) -> Self {
        self.stages.push(Stage::new(name, tasks.into_iter().collect()));
        self
    }

    /// Append daemons supervised during the run phase.
    pub fn add_daemons(mut self, daemons: impl IntoIterator<Item = DaemonTask>) -> Self {
        self.daemons.extend(daemons);
        self
    }

    /// Call `on_change` for every notification received while daemons run.
    ///
    /// The payload is passed through untouched. The listener does not keep
    /// the run phase alive on its own.
    pub fn with_config_changed<T, F>(
        mut self,
        mut updates: mpsc::UnboundedReceiver<T>,
        mut on_change: F,
    ) -> Self
    where
        T: Send + 'static,
        F: FnMut(T) + Send + 'static,
    {
        self.config_listener = Some(Box::new(move |lifetime: Lifetime| {
            async move {
                loop {
                    tokio::select! {
                        _ = lifetime.cancelled() => break,
                        update = updates.recv() => match update {
                            Some(update) => {
                                tracing::debug!("Config changed");
                                on_change(update);
                            }
                            None => {
                                tracing::debug!("Config change source closed");
                                break;
                            }
                        }
                    }
                }
            }
            .boxed()
        }));
        self
    }

    /// Handle for requesting a graceful stop of the run phase.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop_handle.clone()
    }

    /// Shared view of the current phase.
    pub fn phase(&self) -> PhaseCell {
        self.phase.clone()
    }

    /// Run init, then daemons, then teardown.
    ///
    /// Returns the init or daemon failure that ended the run. A stop request
    /// is a clean exit. Callers are expected to treat an error as fatal.
    pub async fn start(mut self) -> Result<(), LifecycleError> {
        let span = tracing::info_span!("app", name = %self.name);
        async move {
            tracing::info!(stages = self.stages.len(), daemons = self.daemons.len(), "Application starting");

            self.phase.advance(Phase::Initializing);
            let (entered, init) = self.run_init_stages().await;

            let result = match init {
                Err(err) => {
                    self.phase.mark_failed();
                    tracing::error!(error = %err, "Application failed to init");
                    Err(err)
                }
                Ok(()) => {
                    tracing::info!("All init stages done, starting daemons");
                    self.phase.advance(Phase::Running);
                    let result = self.run_daemons().await;
                    if let Err(err) = &result {
                        self.phase.mark_failed();
                        tracing::error!(error = %err, "Application failed to run daemons");
                    }
                    result
                }
            };

            self.phase.advance(Phase::CleaningUp);
            self.run_clean_stages(entered).await;
            self.phase.advance(Phase::Terminated);

            if result.is_ok() {
                tracing::info!("Application done");
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Run stages in order. Returns how many stages were entered.
    async fn run_init_stages(&mut self) -> (usize, Result<(), LifecycleError>) {
        let init_timeout = self.config.init_timeout();
        let abort_window = self.config.init_abort_window();
        let lifetime = Lifetime::with_timeout(init_timeout);

        let capacity = self
            .stages
            .iter()
            .map(Stage::pending_tasks)
            .max()
            .unwrap_or(0)
            .max(1);
        let (failure_tx, mut failures) = mpsc::channel(capacity);

        let mut entered = 0;
        for (index, stage) in self.stages.iter_mut().enumerate() {
            let Some(runner) = stage.runner(failure_tx.clone()) else {
                continue;
            };
            entered = index + 1;
            let stage_name = stage.name().to_string();
            tracing::info!(stage = index, name = %stage_name, "Init stage");

            let started = Instant::now();
            let mut completion = tokio::spawn(runner.run(lifetime.clone()));

            let event = tokio::select! {
                biased;

                Some(error) = failures.recv() => StageEvent::Aborted { error, settled: false },
                _ = lifetime.expired() => StageEvent::Aborted {
                    error: LifecycleError::Timeout { phase: TaskPhase::Init, after: init_timeout },
                    settled: false,
                },
                joined = &mut completion => match joined {
                    // A failure may have landed just before fan-in completed.
                    Ok(outcome) => match failures.try_recv() {
                        Ok(error) => StageEvent::Aborted { error, settled: true },
                        Err(_) => {
                            tracing::debug!(
                                stage = index,
                                succeeded = outcome.succeeded,
                                elapsed = ?started.elapsed(),
                                "Init stage done"
                            );
                            StageEvent::Completed
                        }
                    },
                    Err(join_err) => StageEvent::Aborted {
                        error: guard::recover(&stage_name, join_err),
                        settled: true,
                    },
                },
            };
            metrics::record_stage_duration(&stage_name, started.elapsed());

            let (error, settled) = match event {
                StageEvent::Completed => continue,
                StageEvent::Aborted { error, settled } => (error, settled),
            };

            lifetime.cancel();
            tracing::error!(error = %error, window = ?abort_window, "Init aborted, waiting for stage to settle");
            if !settled && tokio::time::timeout(abort_window, &mut completion).await.is_err() {
                tracing::warn!(
                    stage = index,
                    window = ?abort_window,
                    "Init stage did not settle in time, tasks may still be running"
                );
            }
            while let Ok(extra) = failures.try_recv() {
                tracing::warn!(error = %extra, "Additional init failure ignored");
            }
            return (entered, Err(error));
        }

        (entered, Ok(()))
    }

    async fn run_daemons(&mut self) -> Result<(), LifecycleError> {
        let lifetime = Lifetime::new();

        let listener = self.config_listener.take().map(|listen| {
            let child = lifetime.child();
            guard::spawn_guarded(async move { listen(child).await })
        });
        let forwarder = self
            .config
            .handle_signals
            .then(|| signals::forward_signals(self.stop_handle.clone()));

        let supervisor = DaemonSupervisor::new(
            std::mem::take(&mut self.daemons),
            self.config.forced_close_timeout(),
        );
        let exit = supervisor.run(&lifetime, &mut self.stops).await;

        lifetime.cancel();
        if let Some(forwarder) = forwarder {
            forwarder.abort();
        }
        if let Some(listener) = listener {
            let grace = self.config.forced_close_timeout();
            match tokio::time::timeout(grace, listener).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => {
                    let err = guard::recover(CONFIG_LISTENER, join_err);
                    tracing::error!(error = %err, "Config change listener failed");
                }
                Err(_) => {
                    tracing::warn!(timeout = ?grace, "Config change listener did not exit in time, giving up");
                }
            }
        }

        match &exit {
            Exit::Completed => tracing::debug!("Daemons completed"),
            Exit::Stopped { request, forced } => {
                tracing::info!(source = %request.source, forced = *forced, "Daemons stopped")
            }
            Exit::Failed { forced, .. } => tracing::debug!(forced = *forced, "Daemons failed"),
        }
        exit.into_result()
    }

    /// Clean the first `entered` stages in reverse order.
    async fn run_clean_stages(&mut self, entered: usize) {
        let cleanup_timeout = self.config.cleanup_timeout();
        let lifetime = Lifetime::with_timeout(cleanup_timeout);

        for (index, stage) in self.stages.iter_mut().enumerate().take(entered).rev() {
            tracing::info!(stage = index, name = %stage.name(), "Clean stage");
            stage.clean(&lifetime).await;

            if lifetime.is_cancelled() {
                tracing::warn!(stage = index, timeout = ?cleanup_timeout, "Cleanup timed out, skipping remaining stages");
                metrics::record_cleanup_timeout(stage.name());
                return;
            }
        }
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("name", &self.name)
            .field("stages", &self.stages.len())
            .field("daemons", &self.daemons.len())
            .field("phase", &self.phase.get())
            .finish()
    }
}
