//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for an
//! application. All types derive Serde traits for deserialization from
//! config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Lifecycle timeouts and signal handling.
    pub lifecycle: LifecycleConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,

    /// Debug HTTP endpoint.
    pub debug_server: DebugServerConfig,

    /// Config file hot reload.
    pub watch: WatchConfig,
}

/// Lifecycle timeouts. All values in milliseconds.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Deadline for all init stages together. 0 disables the deadline.
    pub init_timeout_ms: u64,

    /// Deadline for the whole teardown. 0 disables the deadline.
    pub cleanup_timeout_ms: u64,

    /// Grace period for daemons after a stop or failure.
    pub forced_close_timeout_ms: u64,

    /// How long an aborted init stage may take to settle before teardown.
    pub init_abort_window_ms: u64,

    /// Translate SIGINT/SIGTERM into stop requests.
    pub handle_signals: bool,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            init_timeout_ms: 0,
            cleanup_timeout_ms: 1000,
            forced_close_timeout_ms: 1000,
            init_abort_window_ms: 1000,
            handle_signals: true,
        }
    }
}

impl LifecycleConfig {
    pub fn init_timeout(&self) -> Duration {
        Duration::from_millis(self.init_timeout_ms)
    }

    pub fn cleanup_timeout(&self) -> Duration {
        Duration::from_millis(self.cleanup_timeout_ms)
    }

    pub fn forced_close_timeout(&self) -> Duration {
        Duration::from_millis(self.forced_close_timeout_ms)
    }

    pub fn init_abort_window(&self) -> Duration {
        Duration::from_millis(self.init_abort_window_ms)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Install the Prometheus recorder.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
        }
    }
}

/// Debug server configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DebugServerConfig {
    /// Enable the debug server.
    pub enabled: bool,

    /// Bind address (e.g., "127.0.0.1:15050").
    pub address: String,

    /// Label shown on the index page, identifies the instance.
    pub token: String,

    /// Graceful drain budget in milliseconds.
    pub drain_timeout_ms: u64,
}

impl Default for DebugServerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: "127.0.0.1:15050".to_string(),
            token: "app".to_string(),
            drain_timeout_ms: 5000,
        }
    }
}

impl DebugServerConfig {
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }
}

/// Config file watching.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct WatchConfig {
    /// Reload the config file when it changes.
    pub enabled: bool,

    /// Poll interval for backends that need one, in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            poll_interval_ms: 2000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_defaults() {
        let config = LifecycleConfig::default();
        assert_eq!(config.init_timeout(), Duration::ZERO);
        assert_eq!(config.cleanup_timeout(), Duration::from_secs(1));
        assert_eq!(config.forced_close_timeout(), Duration::from_secs(1));
        assert_eq!(config.init_abort_window(), Duration::from_secs(1));
        assert!(config.handle_signals);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [lifecycle]
            init_timeout_ms = 3000

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.lifecycle.init_timeout_ms, 3000);
        assert_eq!(config.lifecycle.cleanup_timeout_ms, 1000);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.observability.log_level, "info");
        assert!(!config.debug_server.enabled);
    }
}
