//! Observer server startup helper for embedding in the engine binary.
//!
//! Provides [`spawn_observer`] which launches the Observer HTTP +
//! `WebSocket` server on a background Tokio task, so the API runs
//! concurrently with the tick loop.
//!
//! # Usage
//!
//! ```rust,ignore
//! use shopfloor_observer::server::ServerConfig;
//! use shopfloor_observer::startup::spawn_observer;
//! use shopfloor_observer::state::AppState;
//! use std::sync::Arc;
//!
//! let state = Arc::new(AppState::new(fleet));
//! let handle = spawn_observer(ServerConfig::default(), state)?;
//! ```

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::server::{ServerConfig, ServerError};
use crate::state::AppState;

/// Errors that can occur when spawning the Observer server.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The server failed to bind or start.
    #[error("server start error: {0}")]
    Server(#[from] ServerError),
}

/// Spawn the Observer HTTP server on a background Tokio task.
///
/// The address is validated before spawning so an obvious
/// misconfiguration fails startup instead of a background task. A bind
/// failure inside the task (port in use) is logged at error level.
///
/// # Errors
///
/// Returns [`StartupError::Server`] if the configured address does not
/// parse.
pub fn spawn_observer(
    config: ServerConfig,
    state: Arc<AppState>,
) -> Result<JoinHandle<()>, StartupError> {
    let addr = config.socket_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = crate::server::start_server(&config, state).await {
            tracing::error!(error = %e, "Observer server exited with error");
        }
    });

    tracing::info!(%addr, "Observer server spawned on background task");

    Ok(handle)
}
