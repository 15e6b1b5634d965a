//! One tick over the whole fleet.
//!
//! Each tick advances the clock once, then visits every machine exactly
//! once with the same increment. Machines share no state, so the visit
//! order does not matter; it follows configuration order for readable
//! logs. Only one machine lock is held at a time.

use std::sync::Arc;

use rand::rngs::StdRng;
use shopfloor_machines::AlarmCode;
use shopfloor_types::{ExecutionStatus, MachineId, TickBroadcast};
use tracing::{debug, info, warn};

use crate::clock::{ClockError, SimClock};
use crate::fleet::Fleet;

/// Errors that can occur during tick execution.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    /// A clock operation failed.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },
}

/// Everything the tick loop mutates.
#[derive(Debug)]
pub struct SimulationState {
    /// Tick counter and simulated time.
    pub clock: SimClock,
    /// The machines, shared with the read surface.
    pub fleet: Arc<Fleet>,
    /// Random source for cycle starts, faults, and noise.
    pub rng: StdRng,
}

impl SimulationState {
    /// Bundle the clock, fleet, and random source.
    pub const fn new(clock: SimClock, fleet: Arc<Fleet>, rng: StdRng) -> Self {
        Self { clock, fleet, rng }
    }
}

/// What happened across the fleet during one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickSummary {
    /// The tick that just ran.
    pub tick: u64,
    /// Simulated seconds since start.
    pub sim_seconds: f64,
    /// Machines inside a cycle after the tick.
    pub running: u32,
    /// Machines idle after the tick.
    pub idle: u32,
    /// Machines alarmed after the tick.
    pub alarmed: u32,
    /// Parts completed during the tick.
    pub parts_finished: u32,
    /// Alarms raised by the fault model.
    pub alarms_raised: Vec<(MachineId, AlarmCode)>,
    /// Alarms that cleared.
    pub alarms_cleared: Vec<(MachineId, AlarmCode)>,
}

impl TickSummary {
    /// Serializable form pushed to `WebSocket` subscribers.
    pub fn to_broadcast(&self) -> TickBroadcast {
        TickBroadcast {
            tick: self.tick,
            sim_seconds: self.sim_seconds,
            running: self.running,
            idle: self.idle,
            alarmed: self.alarmed,
            parts_finished: self.parts_finished,
            alarms_raised: self
                .alarms_raised
                .iter()
                .map(|(id, code)| (id.clone(), code.as_str().to_owned()))
                .collect(),
            alarms_cleared: self
                .alarms_cleared
                .iter()
                .map(|(id, code)| (id.clone(), code.as_str().to_owned()))
                .collect(),
        }
    }
}

/// Advance the clock and tick every machine once.
///
/// # Errors
///
/// Returns [`TickError::Clock`] if the tick counter overflows.
pub fn run_tick(state: &mut SimulationState) -> Result<TickSummary, TickError> {
    let tick = state.clock.advance()?;
    let dt = state.clock.tick_seconds();

    let mut summary = TickSummary {
        tick,
        sim_seconds: state.clock.sim_seconds(),
        running: 0,
        idle: 0,
        alarmed: 0,
        parts_finished: 0,
        alarms_raised: Vec::new(),
        alarms_cleared: Vec::new(),
    };

    let rng = &mut state.rng;
    state.fleet.for_each_mut(|machine| {
        let outcome = machine.tick(dt, rng);

        if outcome.part_finished {
            summary.parts_finished = summary.parts_finished.saturating_add(1);
            debug!(tick, machine = %machine.id(), "Part finished");
        }
        if let Some(code) = outcome.alarm_cleared {
            info!(tick, machine = %machine.id(), alarm = %code, "Alarm cleared");
            summary.alarms_cleared.push((machine.id().clone(), code));
        }
        if let Some(code) = outcome.alarm_raised {
            warn!(tick, machine = %machine.id(), alarm = %code, "Alarm raised");
            summary.alarms_raised.push((machine.id().clone(), code));
        }

        let counter = match machine.execution() {
            ExecutionStatus::Running => &mut summary.running,
            ExecutionStatus::Idle => &mut summary.idle,
            ExecutionStatus::Alarm => &mut summary.alarmed,
        };
        *counter = counter.saturating_add(1);
    });

    debug!(
        tick,
        running = summary.running,
        idle = summary.idle,
        alarmed = summary.alarmed,
        "Tick complete"
    );
    Ok(summary)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use rand::SeedableRng;
    use shopfloor_machines::{CncOdds, FleetOdds, LaserOdds, PressBrakeOdds};

    use super::*;
    use crate::config::default_machines;

    fn state_with(odds: &FleetOdds, tick_seconds: f64) -> SimulationState {
        let fleet = Fleet::from_config(&default_machines(), odds).unwrap();
        SimulationState::new(
            SimClock::new(tick_seconds).unwrap(),
            Arc::new(fleet),
            StdRng::seed_from_u64(7),
        )
    }

    fn quiet(cycle_start: f64) -> FleetOdds {
        FleetOdds {
            cnc: CncOdds::quiet(cycle_start),
            press_brake: PressBrakeOdds::quiet(cycle_start),
            laser: LaserOdds::quiet(cycle_start),
        }
    }

    #[test]
    fn every_machine_is_counted_once_per_tick() {
        let mut state = state_with(&FleetOdds::default(), 0.2);
        for expected in 1..=50 {
            let summary = run_tick(&mut state).unwrap();
            assert_eq!(summary.tick, expected);
            assert_eq!(summary.running + summary.idle + summary.alarmed, 6);
        }
    }

    #[test]
    fn each_machine_accrues_exactly_one_increment() {
        let mut state = state_with(&quiet(0.0), 0.5);
        for _ in 0..7200 {
            run_tick(&mut state).unwrap();
        }
        for record in state.fleet.snapshot_all() {
            assert_eq!(record.machine_on_hours, 1.0);
        }
        assert_eq!(state.clock.sim_seconds(), 3600.0);
    }

    #[test]
    fn quiet_fleet_stays_idle() {
        let mut state = state_with(&quiet(0.0), 0.2);
        let summary = run_tick(&mut state).unwrap();
        assert_eq!(summary.idle, 6);
        assert!(summary.alarms_raised.is_empty());
    }

    #[test]
    fn cycling_fleet_finishes_parts() {
        let mut state = state_with(&quiet(1.0), 1.0);
        let mut finished = 0_u32;
        for _ in 0..300 {
            finished += run_tick(&mut state).unwrap().parts_finished;
        }
        assert!(finished >= 6);
        let total: u64 = state
            .fleet
            .snapshot_all()
            .iter()
            .map(|record| record.part_count)
            .sum();
        assert_eq!(total, u64::from(finished));
    }

    #[test]
    fn broadcast_carries_alarm_codes() {
        let summary = TickSummary {
            tick: 3,
            sim_seconds: 0.6,
            running: 1,
            idle: 4,
            alarmed: 1,
            parts_finished: 0,
            alarms_raised: vec![(MachineId::new("haas_vf2"), AlarmCode::SpindleThermal)],
            alarms_cleared: vec![(MachineId::new("durma_press"), AlarmCode::OilOverheat)],
        };
        let broadcast = summary.to_broadcast();
        assert_eq!(broadcast.tick, 3);
        assert_eq!(
            broadcast.alarms_raised,
            vec![(MachineId::new("haas_vf2"), String::from("SPINDLE_THERMAL"))]
        );
        assert_eq!(
            broadcast.alarms_cleared,
            vec![(MachineId::new("durma_press"), String::from("OIL_OVERHEAT"))]
        );
        assert!(broadcast.has_alarm_transitions());
    }
}
