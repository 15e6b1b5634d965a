//! Axum router construction for the Observer API.
//!
//! Assembles all routes (REST, XML, `WebSocket`, operator) into a single
//! [`Router`] with CORS middleware enabled for cross-origin dashboard
//! access.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::operator;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the Observer server.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `GET /ws/ticks` -- `WebSocket` tick summary stream
/// - `GET /api/machines` -- all machine records
/// - `GET /api/machines/{id}` -- single machine record
/// - `POST /api/machines/{id}/inject_alarm` -- force an alarm
/// - `GET /api/alarms` -- active alarms
/// - `GET /mtconnect/{id}/current` -- MTConnect-style XML
/// - `POST /api/operator/{pause,resume,stop}`, `GET /api/operator/status`
///
/// CORS allows any origin so browser dashboards on other ports can poll.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status page
        .route("/", get(handlers::index))
        // WebSocket
        .route("/ws/ticks", get(ws::ws_ticks))
        // REST API
        .route("/api/machines", get(handlers::list_machines))
        .route("/api/machines/{id}", get(handlers::get_machine))
        .route(
            "/api/machines/{id}/inject_alarm",
            post(handlers::inject_alarm),
        )
        .route("/api/alarms", get(handlers::list_alarms))
        // MTConnect-style XML
        .route("/mtconnect/{id}/current", get(handlers::mtconnect_current))
        // Operator controls
        .route("/api/operator/pause", post(operator::pause))
        .route("/api/operator/resume", post(operator::resume))
        .route("/api/operator/stop", post(operator::stop))
        .route("/api/operator/status", get(operator::status))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
