//! `WebSocket` stream of fleet state and tick summaries.
//!
//! `GET /ws/ticks` opens with one [`StreamFrame::Fleet`] frame holding every
//! machine record, so a dashboard can render before the next tick lands.
//! After that each completed tick arrives as a [`StreamFrame::Tick`].
//!
//! With `?alarms_only=true` the stream skips ticks in which no machine
//! entered or left an alarm. Lagging clients skip ahead to the newest tick.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use shopfloor_types::{StreamFrame, TickBroadcast};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::state::AppState;

/// Query parameters for `GET /ws/ticks`.
#[derive(Debug, Default, Clone, Copy, serde::Deserialize)]
pub struct StreamQuery {
    /// Forward only ticks with alarm transitions.
    #[serde(default)]
    pub alarms_only: bool,
}

impl StreamQuery {
    /// The frame to send for `tick`, if this subscriber wants it.
    pub fn frame_for(self, tick: TickBroadcast) -> Option<StreamFrame> {
        if self.alarms_only && !tick.has_alarm_transitions() {
            return None;
        }
        Some(StreamFrame::Tick(tick))
    }
}

/// Upgrade to a `WebSocket` and start streaming.
pub async fn ws_ticks(
    ws: WebSocketUpgrade,
    Query(query): Query<StreamQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state, query))
}

/// Encode a frame as a text message. Failures are logged and skipped.
fn encode(frame: &StreamFrame) -> Option<Message> {
    match serde_json::to_string(frame) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            warn!(error = %e, "Failed to serialize stream frame");
            None
        }
    }
}

async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>, query: StreamQuery) {
    // Subscribe before the fleet snapshot so no tick falls between them.
    let mut rx = state.subscribe();
    debug!(alarms_only = query.alarms_only, "WebSocket client connected");

    let fleet = StreamFrame::Fleet {
        machines: state.fleet.snapshot_all(),
    };
    if let Some(message) = encode(&fleet)
        && socket.send(message).await.is_err()
    {
        debug!("WebSocket client disconnected before fleet frame");
        return;
    }

    loop {
        tokio::select! {
            result = rx.recv() => match result {
                Ok(tick) => {
                    let Some(message) = query.frame_for(tick).as_ref().and_then(encode) else {
                        continue;
                    };
                    if socket.send(message).await.is_err() {
                        debug!("WebSocket client disconnected (send failed)");
                        return;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "WebSocket client lagged, skipping ahead");
                }
                Err(RecvError::Closed) => {
                    debug!("Tick channel closed, ending stream");
                    return;
                }
            },
            msg = socket.recv() => match msg {
                Some(Ok(Message::Close(_))) | None => {
                    debug!("WebSocket client disconnected");
                    return;
                }
                Some(Ok(Message::Ping(data))) => {
                    if socket.send(Message::Pong(data)).await.is_err() {
                        return;
                    }
                }
                Some(Err(e)) => {
                    debug!(error = %e, "WebSocket receive failed");
                    return;
                }
                // Client text and binary frames are ignored.
                Some(Ok(_)) => {}
            },
        }
    }
}
