//! Configuration file watcher for hot reload.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::AppConfig;

/// Live configuration shared with every subsystem.
pub type SharedConfig = Arc<ArcSwap<AppConfig>>;

/// Wrap a loaded configuration for sharing.
pub fn shared(config: AppConfig) -> SharedConfig {
    Arc::new(ArcSwap::from_pointee(config))
}

/// A watcher that monitors the configuration file for changes.
///
/// Each successful reload is stored into the shared config and announced on
/// the update channel.
pub struct ConfigWatcher {
    path: PathBuf,
    current: SharedConfig,
    poll_interval: Duration,
    update_tx: mpsc::UnboundedSender<Arc<AppConfig>>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for configuration updates.
    pub fn new(
        path: &Path,
        current: SharedConfig,
        poll_interval: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<Arc<AppConfig>>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                current,
                poll_interval,
                update_tx,
            },
            update_rx,
        )
    }

    /// Reload from disk now. Invalid files leave the current config in place.
    pub fn reload(&self) -> bool {
        reload(&self.path, &self.current, &self.update_tx)
    }

    /// Start watching the file in a background thread.
    ///
    /// Watching stops when the returned watcher is dropped.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();
        let current = self.current.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!("Config file change detected, reloading...");
                        reload(&path, &current, &tx);
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(self.poll_interval),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

fn reload(
    path: &Path,
    current: &SharedConfig,
    tx: &mpsc::UnboundedSender<Arc<AppConfig>>,
) -> bool {
    match load_config(path) {
        Ok(new_config) => {
            let new_config = Arc::new(new_config);
            current.store(new_config.clone());
            let _ = tx.send(new_config);
            true
        }
        Err(e) => {
            tracing::error!("Failed to reload config: {}. Keeping current configuration.", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn test_reload_swaps_and_notifies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.toml");
        fs::write(&path, "[debug_server]\ntoken = \"one\"\n").unwrap();

        let current = shared(load_config(&path).unwrap());
        let (watcher, mut updates) = ConfigWatcher::new(&path, current.clone(), Duration::from_millis(50));

        fs::write(&path, "[debug_server]\ntoken = \"two\"\n").unwrap();
        assert!(watcher.reload());

        assert_eq!(current.load().debug_server.token, "two");
        assert_eq!(updates.recv().await.unwrap().debug_server.token, "two");
    }

    #[tokio::test]
    async fn test_invalid_reload_keeps_current() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.toml");
        fs::write(&path, "[debug_server]\ntoken = \"one\"\n").unwrap();

        let current = shared(load_config(&path).unwrap());
        let (watcher, mut updates) = ConfigWatcher::new(&path, current.clone(), Duration::from_millis(50));

        fs::write(&path, "[lifecycle]\nforced_close_timeout_ms = 0\n").unwrap();
        assert!(!watcher.reload());

        assert_eq!(current.load().debug_server.token, "one");
        assert!(updates.try_recv().is_err());
    }
}
