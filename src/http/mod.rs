//! HTTP layer.
//!
//! # Responsibilities
//! - Serve Axum routers as daemons that honor their lifetime
//!
//! # Design Decisions
//! - A server is an ordinary daemon; the orchestrator gives it no special
//!   treatment beyond cancellation

pub mod server;

pub use server::serve_until_cancelled;
