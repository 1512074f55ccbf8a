//! Configuration loading from disk and environment.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::config::schema::{AppConfig, LogFormat};
use crate::config::validation::{validate_config, ValidationError};

/// Prefix of environment variables that override file settings.
pub const ENV_PREFIX: &str = "STAGEHAND_";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Env { key: String, value: String },
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Env { key, value } => {
                write!(f, "Invalid value '{}' for environment variable {}", value, key)
            }
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            _ => None,
        }
    }
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let mut config: AppConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;

    apply_env_overrides(&mut config, std::env::vars())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Like [`load_config`], but a missing file yields the defaults.
pub fn load_or_default(path: &Path) -> Result<AppConfig, ConfigError> {
    match load_config(path) {
        Err(ConfigError::Io(e)) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            let mut config = AppConfig::default();
            apply_env_overrides(&mut config, std::env::vars())?;
            validate_config(&config).map_err(ConfigError::Validation)?;
            Ok(config)
        }
        other => other,
    }
}

/// Apply `STAGEHAND_*` overrides from `vars` onto `config`.
///
/// Unknown keys under the prefix are ignored.
pub fn apply_env_overrides<I>(config: &mut AppConfig, vars: I) -> Result<(), ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    for (key, value) in vars {
        let Some(name) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        match name {
            "INIT_TIMEOUT_MS" => config.lifecycle.init_timeout_ms = parse(&key, &value)?,
            "CLEANUP_TIMEOUT_MS" => config.lifecycle.cleanup_timeout_ms = parse(&key, &value)?,
            "FORCED_CLOSE_TIMEOUT_MS" => config.lifecycle.forced_close_timeout_ms = parse(&key, &value)?,
            "HANDLE_SIGNALS" => config.lifecycle.handle_signals = parse(&key, &value)?,
            "LOG_LEVEL" => config.observability.log_level = value,
            "LOG_FORMAT" => config.observability.log_format = parse_format(&key, &value)?,
            "METRICS_ENABLED" => config.observability.metrics_enabled = parse(&key, &value)?,
            "DEBUG_ENABLED" => config.debug_server.enabled = parse(&key, &value)?,
            "DEBUG_ADDRESS" => config.debug_server.address = value,
            "DEBUG_TOKEN" => config.debug_server.token = value,
            "WATCH_ENABLED" => config.watch.enabled = parse(&key, &value)?,
            _ => {}
        }
    }
    Ok(())
}

fn parse_format(key: &str, value: &str) -> Result<LogFormat, ConfigError> {
    match value.trim() {
        "pretty" => Ok(LogFormat::Pretty),
        "json" => Ok(LogFormat::Json),
        _ => Err(ConfigError::Env {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env {
        key: key.to_string(),
        value: value.to_string(),
    })
}
