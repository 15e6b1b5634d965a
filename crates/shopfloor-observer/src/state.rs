//! Shared application state for the Observer API server.
//!
//! [`AppState`] holds the fleet the REST endpoints read from, the
//! broadcast channel for tick summaries, and the operator controls when
//! a tick loop is attached.

use std::sync::Arc;

use shopfloor_core::fleet::Fleet;
use shopfloor_core::operator::OperatorState;
use shopfloor_types::TickBroadcast;
use tokio::sync::broadcast;

/// Capacity of the broadcast channel for tick summaries.
///
/// If a subscriber falls behind by more than this many messages it will
/// receive a [`broadcast::error::RecvError::Lagged`] and skip to the
/// newest message.
const BROADCAST_CAPACITY: usize = 256;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The machines served by the REST and XML endpoints.
    pub fleet: Arc<Fleet>,
    /// Broadcast sender for tick summary messages.
    pub tx: broadcast::Sender<TickBroadcast>,
    /// Shared operator control state (present when the simulation is running).
    pub operator_state: Option<Arc<OperatorState>>,
}

impl AppState {
    /// Create a read-only application state over `fleet`.
    pub fn new(fleet: Arc<Fleet>) -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            fleet,
            tx,
            operator_state: None,
        }
    }

    /// Create an application state with operator control state attached.
    pub fn with_operator(fleet: Arc<Fleet>, operator: Arc<OperatorState>) -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            fleet,
            tx,
            operator_state: Some(operator),
        }
    }

    /// Subscribe to the tick broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<TickBroadcast> {
        self.tx.subscribe()
    }

    /// Publish a tick summary to all connected clients.
    ///
    /// Returns the number of receivers that received the message, 0 when
    /// no clients are connected.
    pub fn broadcast(&self, summary: &TickBroadcast) -> usize {
        // send only fails when there are zero receivers.
        self.tx.send(summary.clone()).unwrap_or(0)
    }
}
