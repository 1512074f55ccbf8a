//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Lifecycle decision points produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges, histograms via the metrics facade)
//!
//! Consumers:
//!     → Log output (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape on the debug server)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Metrics are cheap (atomic increments) and no-ops without a recorder
//! - Subscriber and recorder are installed by the binary, never by the library

pub mod logging;
pub mod metrics;
