//! HTTP serving tied to a lifetime.
//!
//! # Responsibilities
//! - Serve an Axum router on a bound listener
//! - Wire up request tracing
//! - Stop accepting on cancellation and drain in-flight requests
//!
//! # Design Decisions
//! - Draining is bounded: after the drain budget the server is dropped
//! - Cancellation is a clean exit, only serve errors are returned

use std::future::IntoFuture;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::lifecycle::Lifetime;

/// Serve `router` until `lifetime` ends, then drain for at most `drain`.
pub async fn serve_until_cancelled(
    listener: TcpListener,
    router: Router,
    lifetime: Lifetime,
    drain: Duration,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, "HTTP server starting");

    let shutdown = lifetime.clone();
    let app = router.layer(TraceLayer::new_for_http());
    let serve = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
        })
        .into_future();
    let mut serve = std::pin::pin!(serve);

    tokio::select! {
        res = &mut serve => {
            tracing::info!(address = %addr, "HTTP server stopped");
            return res;
        }
        _ = lifetime.cancelled() => {}
    }

    tracing::debug!(address = %addr, drain = ?drain, "HTTP server draining");
    match tokio::time::timeout(drain, serve).await {
        Ok(res) => {
            tracing::info!(address = %addr, "HTTP server stopped");
            res
        }
        Err(_) => {
            tracing::warn!(address = %addr, drain = ?drain, "HTTP server drain timed out");
            Ok(())
        }
    }
}
