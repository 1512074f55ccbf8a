//! Staged application lifecycle runtime.
//!
//! An [`Application`] runs ordered init stages, then a set of long-lived
//! daemons, then tears down every entered stage in reverse order.

pub mod config;
pub mod debug;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod version;

pub use config::schema::AppConfig;
pub use debug::{DebugParams, DebugServer};
pub use lifecycle::{
    Application, CleanupTask, DaemonTask, InitTask, LifecycleError, Lifetime, Phase, StopHandle,
};
pub use version::VersionInfo;
