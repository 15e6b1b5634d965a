//! Operator REST API handlers for runtime control of the tick loop.
//!
//! These endpoints are separate from the read-only machine API. They
//! are only functional when the [`AppState`] was built with
//! [`AppState::with_operator`]; otherwise they answer 500.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/operator/pause` | Pause the tick loop |
//! | `POST` | `/api/operator/resume` | Resume the tick loop |
//! | `POST` | `/api/operator/stop` | End the tick loop after the current tick |
//! | `GET` | `/api/operator/status` | Current simulation status |

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use shopfloor_core::operator::OperatorState;
use tracing::info;

use crate::error::ObserverError;
use crate::state::AppState;

/// Generic success response.
#[derive(Debug, serde::Serialize)]
struct OperatorResponse {
    /// Whether the operation succeeded.
    ok: bool,
    /// Human-readable message.
    message: String,
}

fn operator(state: &AppState) -> Result<&Arc<OperatorState>, ObserverError> {
    state
        .operator_state
        .as_ref()
        .ok_or_else(|| ObserverError::Internal("operator state not available".to_owned()))
}

// ---------------------------------------------------------------------------
// POST /api/operator/pause
// ---------------------------------------------------------------------------

/// Pause the simulation tick loop.
///
/// Machines keep their state and the read endpoints keep answering; the
/// loop sleeps until resumed or stopped.
pub async fn pause(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ObserverError> {
    operator(&state)?.pause();
    info!("Operator paused the simulation");

    Ok(Json(OperatorResponse {
        ok: true,
        message: "Simulation paused".to_owned(),
    }))
}

// ---------------------------------------------------------------------------
// POST /api/operator/resume
// ---------------------------------------------------------------------------

/// Resume the simulation tick loop after a pause.
pub async fn resume(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    operator(&state)?.resume();
    info!("Operator resumed the simulation");

    Ok(Json(OperatorResponse {
        ok: true,
        message: "Simulation resumed".to_owned(),
    }))
}

// ---------------------------------------------------------------------------
// POST /api/operator/stop
// ---------------------------------------------------------------------------

/// Trigger a clean simulation shutdown.
///
/// The tick loop finishes its current tick and exits. The HTTP server
/// keeps running so the final machine state can still be read.
pub async fn stop(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ObserverError> {
    operator(&state)?.request_stop();
    info!("Operator requested stop");

    Ok(Json(OperatorResponse {
        ok: true,
        message: "Stop requested -- simulation will end after current tick".to_owned(),
    }))
}

// ---------------------------------------------------------------------------
// GET /api/operator/status
// ---------------------------------------------------------------------------

/// Return tick, pause state, stop flag, limits, and end reason.
pub async fn status(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let status = operator(&state)?.status().await;
    Ok(Json(status))
}
