//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Init (stage.rs, cleanup.rs):
//!     Stage 1 → Stage 2 → ... (tasks inside a stage run concurrently)
//!     first failure / panic / timeout → cancel → let the stage settle → abort
//!
//! Run (supervisor.rs, signals.rs):
//!     All daemons under one lifetime
//!     stop request or daemon failure → cancel → grace period → give up
//!
//! Teardown (application.rs):
//!     Cleanups of entered stages, last stage first, bounded by a timeout
//! ```
//!
//! # Design Decisions
//! - Ordered init: stages strictly in addition order, fan-out within a stage
//! - Panics are contained per task and reported as named errors
//! - Every wait has a deadline branch; cancellation is cooperative
//! - Teardown errors are logged, never propagated

pub mod application;
pub mod cleanup;
pub mod error;
mod guard;
pub mod lifetime;
pub mod phase;
pub mod signals;
pub mod stage;
pub mod supervisor;
pub mod task;

pub use application::Application;
pub use error::{BoxError, LifecycleError, TaskPhase};
pub use guard::FailureSender;
pub use lifetime::{EndReason, Lifetime};
pub use phase::{Phase, PhaseCell};
pub use signals::{StopHandle, StopRequest};
pub use task::{CleanupTask, DaemonTask, InitTask};
