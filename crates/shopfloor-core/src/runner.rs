//! Simulation loop runner with operator controls.
//!
//! [`run_simulation`] drives [`run_tick`] at a fixed real-time period:
//!
//! - **Bounded run**: stop after `max_ticks` (0 = run until stopped)
//! - **Pause/resume**: operator can halt and continue the loop
//! - **Operator stop**: clean stop via the observer API or Ctrl-C
//! - **Drift correction**: each sleep is the period minus the time the
//!   tick took, floored at zero
//!
//! [`run_tick`]: crate::tick::run_tick

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::operator::{OperatorState, SimulationEndReason};
use crate::tick::{self, SimulationState, TickError, TickSummary};

/// Errors that can occur during the simulation run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A tick execution failed.
    #[error("tick error: {source}")]
    Tick {
        /// The underlying tick error.
        #[from]
        source: TickError,
    },
}

/// Result of the simulation run.
#[derive(Debug)]
pub struct SimulationResult {
    /// The reason the simulation ended.
    pub end_reason: SimulationEndReason,
    /// The last tick summary, if any tick completed.
    pub final_summary: Option<TickSummary>,
    /// Total number of ticks executed.
    pub total_ticks: u64,
}

/// Callback invoked after each tick completes.
///
/// The engine uses this to push tick summaries to `WebSocket`
/// subscribers.
pub trait TickCallback: Send {
    /// Called after a tick completes successfully.
    fn on_tick(&mut self, summary: &TickSummary, state: &SimulationState);
}

/// A no-op tick callback for testing.
pub struct NoOpCallback;

impl TickCallback for NoOpCallback {
    fn on_tick(&mut self, _summary: &TickSummary, _state: &SimulationState) {}
}

/// Time left in the period after a tick that took `elapsed`.
pub fn remaining_sleep(interval: Duration, elapsed: Duration) -> Duration {
    interval.saturating_sub(elapsed)
}

/// Run the simulation loop until a termination condition is met.
///
/// # Errors
///
/// Returns [`RunnerError`] if a tick execution fails unrecoverably.
pub async fn run_simulation(
    state: &mut SimulationState,
    operator: &Arc<OperatorState>,
    callback: &mut dyn TickCallback,
) -> Result<SimulationResult, RunnerError> {
    let mut last_summary: Option<TickSummary> = None;
    let mut total_ticks: u64 = 0;
    let interval = Duration::from_millis(operator.tick_interval_ms());

    info!(
        max_ticks = operator.max_ticks(),
        tick_interval_ms = operator.tick_interval_ms(),
        tick_seconds = state.clock.tick_seconds(),
        machines = state.fleet.len(),
        "Simulation starting"
    );

    loop {
        // --- Check pause ---
        if operator.is_paused() {
            info!("Simulation paused, waiting for resume...");
            operator.wait_if_paused().await;
            info!("Simulation resumed");
        }

        // --- Check stop request (before tick) ---
        if operator.is_stop_requested() {
            info!("Operator stop requested");
            let reason = SimulationEndReason::OperatorStop;
            operator.set_end_reason(reason.clone()).await;
            return Ok(SimulationResult {
                end_reason: reason,
                final_summary: last_summary,
                total_ticks,
            });
        }

        // --- Execute tick ---
        let started = Instant::now();
        let summary = tick::run_tick(state)?;
        total_ticks = total_ticks.saturating_add(1);
        operator.record_tick(summary.tick);

        // --- Notify callback ---
        callback.on_tick(&summary, state);

        // --- Check tick limit (after tick) ---
        if operator.tick_limit_reached(summary.tick) {
            info!(
                tick = summary.tick,
                max_ticks = operator.max_ticks(),
                "Tick limit reached"
            );
            let reason = SimulationEndReason::MaxTicksReached;
            operator.set_end_reason(reason.clone()).await;
            return Ok(SimulationResult {
                end_reason: reason,
                final_summary: Some(summary),
                total_ticks,
            });
        }

        last_summary = Some(summary);

        // --- Sleep for the rest of the period ---
        let pause = remaining_sleep(interval, started.elapsed());
        if pause.is_zero() {
            // Overrun tick: still give the observer tasks a turn.
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(pause).await;
        }
    }
}

/// Log the simulation end sequence.
///
/// Called after [`run_simulation`] returns. The HTTP server keeps
/// serving the final state after this.
pub fn log_simulation_end(result: &SimulationResult) {
    info!(
        reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        final_tick = result.final_summary.as_ref().map(|s| s.tick),
        "Simulation ended"
    );

    if let Some(ref summary) = result.final_summary {
        info!(
            tick = summary.tick,
            sim_seconds = summary.sim_seconds,
            running = summary.running,
            idle = summary.idle,
            alarmed = summary.alarmed,
            "Final tick summary"
        );
    } else {
        warn!("Simulation ended with no ticks executed");
    }
}
