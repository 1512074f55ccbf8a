//! Stagehand demo service.
//!
//! # Architecture Overview
//!
//! ```text
//!   app.toml + STAGEHAND_* ──▶ config ──▶ logging / metrics
//!                                 │
//!                                 ▼
//!   ┌──────────────────────── Application ────────────────────────┐
//!   │  init:    resources ──▶ services                             │
//!   │  daemons: heartbeat, debug-server                            │
//!   │  cleanup: services ──▶ resources (reverse order)             │
//!   └──────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use stagehand::config::{self, watcher, ConfigWatcher};
use stagehand::debug::{DebugParams, DebugServer};
use stagehand::lifecycle::{Application, BoxError, CleanupTask, DaemonTask, InitTask, Lifetime};
use stagehand::observability::{logging, metrics};
use stagehand::version::VersionInfo;
use stagehand::AppConfig;

const APP_NAME: &str = "stagehand";

#[derive(Parser)]
#[command(name = APP_NAME, about = "Staged application lifecycle demo", disable_version_flag = true)]
struct Cli {
    /// Application config file.
    #[arg(short, long, default_value = "app.toml")]
    file: PathBuf,

    /// Print version information and exit.
    #[arg(short, long)]
    version: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if cli.version {
        print!("{}", VersionInfo::current().render(APP_NAME));
        return;
    }

    let config = match config::load_or_default(&cli.file) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {}", cli.file.display(), e);
            std::process::exit(1);
        }
    };

    if let Err(e) = logging::init_logging(&config.observability) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }
    tracing::info!(version = VersionInfo::current().version, file = %cli.file.display(), "{} starting", APP_NAME);

    let prometheus = if config.observability.metrics_enabled {
        match metrics::init_metrics() {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::error!(error = %e, "Failed to install metrics recorder");
                None
            }
        }
    } else {
        None
    };

    let shared = watcher::shared(config.clone());
    let (config_watcher, updates) =
        ConfigWatcher::new(&cli.file, shared.clone(), Duration::from_millis(config.watch.poll_interval_ms));
    // Dropping the watcher stops watching, so keep it for the whole run.
    let _watch_guard = if config.watch.enabled {
        match config_watcher.run() {
            Ok(w) => Some(w),
            Err(e) => {
                tracing::warn!(error = %e, "Config watching disabled");
                None
            }
        }
    } else {
        None
    };

    let params = DebugParams::new();
    let app = build_app(&config, params.clone());

    let mut debug_server = DebugServer::new(APP_NAME, config.debug_server.clone(), app.phase())
        .with_params(params.clone());
    if let Some(handle) = prometheus {
        debug_server = debug_server.with_metrics(handle);
    }

    let app = app
        .add_daemons([debug_server.into_daemon()])
        .with_config_changed(updates, move |updated: Arc<AppConfig>| {
            tracing::info!(
                log_level = %updated.observability.log_level,
                debug_enabled = updated.debug_server.enabled,
                "Configuration reloaded"
            );
        });

    let live = shared.clone();
    params.publish("config", move || AppConfig::clone(&live.load()));

    if let Err(e) = app.start().await {
        tracing::error!(task = e.task_name(), error = %e, "Application exited with error");
        std::process::exit(1);
    }
}

fn build_app(config: &AppConfig, params: DebugParams) -> Application {
    let beats = Arc::new(AtomicU64::new(0));

    let connections = {
        let params = params.clone();
        InitTask::new("connections", move |_lifetime: Lifetime| async move {
            tracing::info!("Opening connections");
            params.publish("connections", || "open");
            let cleanup_params = params.clone();
            Ok::<_, std::io::Error>(Some(CleanupTask::new(move |_| async move {
                cleanup_params.remove("connections");
                tracing::info!("Connections closed");
            })))
        })
    };

    let cache = InitTask::new("cache", |lifetime: Lifetime| async move {
        let warmed: Result<Option<CleanupTask>, BoxError> = tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(50)) => Ok(None),
            reason = lifetime.cancelled() => Err(format!("cache warmup interrupted: {reason:?}").into()),
        };
        if warmed.is_ok() {
            tracing::info!("Cache warmed");
        }
        warmed
    });

    let services = {
        let beats = beats.clone();
        InitTask::new("services", move |_lifetime: Lifetime| async move {
            params.publish("heartbeats", move || beats.load(Ordering::Relaxed));
            tracing::info!("Services registered");
            Ok::<_, std::io::Error>(Some(CleanupTask::new(|_| async {
                tracing::info!("Services deregistered");
            })))
        })
    };

    let heartbeat = DaemonTask::new("heartbeat", move |lifetime: Lifetime| async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(5));
        loop {
            tokio::select! {
                _ = lifetime.cancelled() => break,
                _ = ticker.tick() => {
                    let n = beats.fetch_add(1, Ordering::Relaxed) + 1;
                    tracing::debug!(beats = n, "Heartbeat");
                }
            }
        }
        Ok::<_, std::io::Error>(())
    });

    Application::new(APP_NAME, config.lifecycle.clone())
        .add_init_stage("resources", [connections, cache])
        .add_init_stage("services", [services])
        .add_daemons([heartbeat])
}
