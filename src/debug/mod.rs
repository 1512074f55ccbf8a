//! Debug HTTP endpoint.
//!
//! # Responsibilities
//! - Report the application phase and version
//! - Expose published debug values as JSON
//! - Expose Prometheus metrics when a recorder is installed
//!
//! # Design Decisions
//! - Runs as an ordinary daemon; disabled means it returns at once
//! - Binding is separate from serving so callers can learn the port first

pub mod handlers;
pub mod params;

use std::net::SocketAddr;

use axum::{routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::DebugServerConfig;
use crate::http::serve_until_cancelled;
use crate::lifecycle::{DaemonTask, Lifetime, PhaseCell};
use self::handlers::*;
pub use self::params::DebugParams;

/// Name the debug server daemon is registered under.
pub const DAEMON_NAME: &str = "debug-server";

#[derive(Debug, Error)]
pub enum DebugServerError {
    #[error("invalid debug server address '{0}'")]
    InvalidAddress(String),

    #[error("failed to bind debug server on {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("debug server failed: {0}")]
    Serve(#[from] std::io::Error),
}

/// State shared by the debug handlers.
#[derive(Clone)]
pub struct DebugState {
    pub app_name: String,
    pub token: String,
    pub phase: PhaseCell,
    pub params: DebugParams,
    pub metrics: Option<PrometheusHandle>,
}

pub fn setup_debug_router(state: DebugState) -> Router {
    Router::new()
        .route("/", get(get_index))
        .route("/debug/status", get(get_status))
        .route("/debug/vars", get(get_vars))
        .route("/metrics", get(get_metrics))
        .with_state(state)
}

/// Debug server for one application.
pub struct DebugServer {
    config: DebugServerConfig,
    state: DebugState,
}

impl DebugServer {
    pub fn new(app_name: impl Into<String>, config: DebugServerConfig, phase: PhaseCell) -> Self {
        let state = DebugState {
            app_name: app_name.into(),
            token: config.token.clone(),
            phase,
            params: DebugParams::new(),
            metrics: None,
        };
        Self { config, state }
    }

    /// Serve values from `params` on `/debug/vars`.
    pub fn with_params(mut self, params: DebugParams) -> Self {
        self.state.params = params;
        self
    }

    /// Serve `handle`'s output on `/metrics`.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.state.metrics = Some(handle);
        self
    }

    pub fn params(&self) -> &DebugParams {
        &self.state.params
    }

    /// Bind the configured address.
    pub async fn bind(self) -> Result<BoundDebugServer, DebugServerError> {
        let address: SocketAddr = self
            .config
            .address
            .parse()
            .map_err(|_| DebugServerError::InvalidAddress(self.config.address.clone()))?;
        let listener = TcpListener::bind(address)
            .await
            .map_err(|source| DebugServerError::Bind { address, source })?;
        let local_addr = listener.local_addr()?;

        tracing::info!(token = %self.state.token, address = %local_addr, "Debug server bound");
        Ok(BoundDebugServer {
            listener,
            local_addr,
            router: setup_debug_router(self.state),
            drain: self.config.drain_timeout(),
        })
    }

    /// Daemon that binds and serves, or returns at once when disabled.
    pub fn into_daemon(self) -> DaemonTask {
        DaemonTask::new(DAEMON_NAME, move |lifetime: Lifetime| async move {
            if !self.config.enabled {
                tracing::info!("Debug server is not enabled");
                return Ok(());
            }
            self.bind().await?.serve(lifetime).await
        })
    }
}

/// A debug server with its listener already bound.
pub struct BoundDebugServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    router: Router,
    drain: std::time::Duration,
}

impl BoundDebugServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve until `lifetime` ends.
    pub async fn serve(self, lifetime: Lifetime) -> Result<(), DebugServerError> {
        serve_until_cancelled(self.listener, self.router, lifetime, self.drain).await?;
        Ok(())
    }

    /// Daemon serving on the already-bound listener.
    pub fn into_daemon(self) -> DaemonTask {
        DaemonTask::new(DAEMON_NAME, move |lifetime: Lifetime| self.serve(lifetime))
    }
}
