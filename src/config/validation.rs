//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (grace windows > 0)
//! - Check addresses and log settings parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use tracing_subscriber::filter::LevelFilter;

use crate::config::schema::AppConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },

    #[error("debug_server.address '{0}' is not a valid socket address")]
    InvalidAddress(String),

    #[error("observability.log_level '{0}' is not a known level")]
    InvalidLogLevel(String),

    #[error("watch.poll_interval_ms must be greater than zero when watching is enabled")]
    ZeroPollInterval,
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.lifecycle.forced_close_timeout_ms == 0 {
        errors.push(ValidationError::ZeroDuration {
            field: "lifecycle.forced_close_timeout_ms",
        });
    }
    if config.lifecycle.init_abort_window_ms == 0 {
        errors.push(ValidationError::ZeroDuration {
            field: "lifecycle.init_abort_window_ms",
        });
    }

    if config.debug_server.enabled
        && config.debug_server.address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress(
            config.debug_server.address.clone(),
        ));
    }

    if config.observability.log_level.parse::<LevelFilter>().is_err() {
        errors.push(ValidationError::InvalidLogLevel(
            config.observability.log_level.clone(),
        ));
    }

    if config.watch.enabled && config.watch.poll_interval_ms == 0 {
        errors.push(ValidationError::ZeroPollInterval);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = AppConfig::default();
        config.lifecycle.forced_close_timeout_ms = 0;
        config.debug_server.enabled = true;
        config.debug_server.address = "not-an-address".into();
        config.observability.log_level = "loud".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::InvalidLogLevel("loud".into())));
    }

    #[test]
    fn test_disabled_debug_server_address_is_not_checked() {
        let mut config = AppConfig::default();
        config.debug_server.address = "whatever".into();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_zero_init_timeout_is_allowed() {
        let mut config = AppConfig::default();
        config.lifecycle.init_timeout_ms = 0;
        config.lifecycle.cleanup_timeout_ms = 0;
        assert!(validate_config(&config).is_ok());
    }
}
