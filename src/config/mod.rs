//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) + STAGEHAND_* environment
//!     → loader.rs (parse, deserialize, apply overrides)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → lifecycle settings handed to the Application explicitly
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of Arc<AppConfig>
//!     → change notification to whoever subscribed
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - A missing config file is not an error; defaults are used
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, load_or_default, ConfigError};
pub use schema::AppConfig;
pub use schema::DebugServerConfig;
pub use schema::LifecycleConfig;
pub use schema::ObservabilityConfig;
pub use watcher::{ConfigWatcher, SharedConfig};
