//! Tick callback that feeds the Observer API.
//!
//! The REST endpoints read the fleet directly, so the only per-tick work
//! is broadcasting a [`TickBroadcast`](shopfloor_types::TickBroadcast)
//! to connected `WebSocket` clients.

use std::sync::Arc;

use shopfloor_core::runner::TickCallback;
use shopfloor_core::tick::{SimulationState, TickSummary};
use shopfloor_observer::state::AppState;
use tracing::debug;

/// Callback that bridges the tick loop to the Observer API.
pub struct ObserverCallback {
    state: Arc<AppState>,
}

impl ObserverCallback {
    /// Create a new observer callback backed by the given app state.
    pub const fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }
}

impl TickCallback for ObserverCallback {
    fn on_tick(&mut self, summary: &TickSummary, _sim: &SimulationState) {
        let receivers = self.state.broadcast(&summary.to_broadcast());
        debug!(tick = summary.tick, receivers, "Tick broadcast sent");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use shopfloor_core::clock::SimClock;
    use shopfloor_core::config::SimulationConfig;
    use shopfloor_core::fleet::Fleet;
    use shopfloor_core::runner::TickCallback;
    use shopfloor_core::tick::{SimulationState, run_tick};
    use shopfloor_observer::state::AppState;

    use super::ObserverCallback;

    #[tokio::test]
    async fn each_tick_reaches_subscribers() {
        let config = SimulationConfig::default();
        let fleet = Arc::new(Fleet::from_config(&config.machines, &config.odds).unwrap());
        let app_state = Arc::new(AppState::new(Arc::clone(&fleet)));
        let mut rx = app_state.subscribe();

        let mut sim = SimulationState::new(
            SimClock::new(0.2).unwrap(),
            fleet,
            StdRng::seed_from_u64(5),
        );
        let mut callback = ObserverCallback::new(app_state);

        for _ in 0..3 {
            let summary = run_tick(&mut sim).unwrap();
            callback.on_tick(&summary, &sim);
        }

        for expected in 1..=3 {
            let received = rx.recv().await.unwrap();
            assert_eq!(received.tick, expected);
            assert_eq!(received.running + received.idle + received.alarmed, 6);
        }
    }
}
