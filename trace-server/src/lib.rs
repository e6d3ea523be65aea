//! REST API and operator CLI for the context graph decision service.
//!
//! The binary wires a [`trace_graph::GraphStore`], an `OpenAI` chat model and
//! an embedding model into a [`trace_orchestrator::DecisionOrchestrator`] and
//! exposes it through [`routes::router`].

#![warn(missing_docs, clippy::pedantic)]

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::{info, warn};

pub use config::{Cli, Command, Settings, StoreKind};
pub use error::{ApiError, ApiResult};
pub use routes::router;
pub use state::AppState;

/// Serves the API on `addr` until Ctrl-C is received.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn serve(state: AppState, addr: SocketAddr) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "context graph API listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("context graph API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
