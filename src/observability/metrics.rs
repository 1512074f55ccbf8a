//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define lifecycle metrics (stage latency, task failures, running daemons)
//! - Install the Prometheus recorder whose output the debug server exposes
//!
//! # Metrics
//! - `stagehand_stage_duration_seconds` (histogram): init stage latency by stage
//! - `stagehand_task_failures_total` (counter): failures by phase and kind
//! - `stagehand_daemons_running` (gauge): daemons that have not returned yet
//! - `stagehand_cleanup_timeouts_total` (counter): teardowns cut short, by stage
//! - `stagehand_stop_requests_total` (counter): stop requests acted on, by source
//!
//! # Design Decisions
//! - Recording without an installed recorder is a no-op, so the library never
//!   requires one

use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::lifecycle::TaskPhase;

/// Install the Prometheus recorder and return the handle used for rendering.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    tracing::info!("Metrics recorder installed");
    Ok(handle)
}

pub fn record_stage_duration(stage: &str, elapsed: Duration) {
    histogram!("stagehand_stage_duration_seconds", "stage" => stage.to_string())
        .record(elapsed.as_secs_f64());
}

pub fn record_task_failure(phase: TaskPhase, kind: &'static str) {
    counter!("stagehand_task_failures_total", "phase" => phase.as_str(), "kind" => kind)
        .increment(1);
}

pub fn set_daemons_running(count: usize) {
    gauge!("stagehand_daemons_running").set(count as f64);
}

pub fn record_cleanup_timeout(stage: &str) {
    counter!("stagehand_cleanup_timeouts_total", "stage" => stage.to_string()).increment(1);
}

pub fn record_stop_request(source: &str) {
    counter!("stagehand_stop_requests_total", "source" => source.to_string()).increment(1);
}
