//! Observer API server for the Shopfloor simulator.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **REST endpoints** for reading machine snapshots and active alarms,
//!   and for forcing an alarm onto a machine
//! - **MTConnect-style XML** (`/mtconnect/{id}/current`) for consumers
//!   that speak the `MTConnectStreams` document shape
//! - **`WebSocket` endpoint** (`/ws/ticks`) for real-time tick summary
//!   streaming via [`tokio::sync::broadcast`]
//! - **Operator REST endpoints** for pausing, resuming, and stopping the
//!   tick loop
//! - **Minimal HTML status page** (`GET /`) with fleet counts and links
//!
//! # Architecture
//!
//! Handlers read straight from the shared [`Fleet`]. Each read locks one
//! machine just long enough to clone it, so requests never hold the tick
//! loop for more than a single machine update. `WebSocket` clients
//! receive tick summaries through a broadcast channel with automatic lag
//! handling.
//!
//! [`Fleet`]: shopfloor_core::fleet::Fleet

pub mod error;
pub mod handlers;
pub mod mtconnect;
pub mod operator;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use startup::{StartupError, spawn_observer};
pub use state::AppState;
