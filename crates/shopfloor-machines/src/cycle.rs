//! Shared building blocks of the three phase machines.
//!
//! - [`CycleTimer`] holds the current phase and the time spent in it.
//! - [`Counters`] holds the cumulative, never-decreasing production and
//!   usage counters.
//! - [`MachineCore`] bundles both with the alarm slot and derives the
//!   coarse [`ExecutionStatus`] from them.
//! - [`CycleModel`] is the contract every variant implements.
//!
//! Execution status is never stored. It is computed from the alarm slot
//! and the phase, so an alarm without `ALARM` status (or the reverse)
//! cannot be represented.

use rand::Rng;
use shopfloor_types::{AxisPositions, ExecutionStatus, MachineKind, VariantTelemetry};

use crate::alarm::AlarmCode;

/// Slack allowed when comparing accumulated phase time against a
/// duration, so `15 x 0.2 s` counts as 3 seconds.
const PHASE_TIME_EPSILON: f64 = 1e-9;

/// Seconds per hour, for hour counters.
pub(crate) const SECONDS_PER_HOUR: f64 = 3600.0;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// A variant-specific cycle phase enumeration.
pub trait Phase: Copy + Eq + core::fmt::Debug {
    /// The phase a machine rests in between cycles.
    const IDLE: Self;

    /// Wire name of the phase (`SPINDLE_RAMP`, `BEND`, ...).
    fn as_str(self) -> &'static str;
}

/// Current phase plus seconds elapsed since entering it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleTimer<P> {
    phase: P,
    time_in_phase: f64,
}

impl<P: Phase> CycleTimer<P> {
    /// Start idle with zero elapsed time.
    pub const fn new() -> Self {
        Self {
            phase: P::IDLE,
            time_in_phase: 0.0,
        }
    }

    /// The current phase.
    pub const fn phase(&self) -> P {
        self.phase
    }

    /// Seconds since the current phase was entered.
    pub const fn time_in_phase(&self) -> f64 {
        self.time_in_phase
    }

    /// Let `dt` seconds pass in the current phase.
    pub fn advance(&mut self, dt: f64) {
        self.time_in_phase += dt;
    }

    /// Move to `next`. Elapsed time resets only if the phase changes.
    ///
    /// Returns whether a transition happened.
    pub fn enter(&mut self, next: P) -> bool {
        if next == self.phase {
            return false;
        }
        self.phase = next;
        self.time_in_phase = 0.0;
        true
    }

    /// Whether at least `seconds` have passed in the current phase.
    pub fn elapsed(&self, seconds: f64) -> bool {
        self.time_in_phase + PHASE_TIME_EPSILON >= seconds
    }
}

impl<P: Phase> Default for CycleTimer<P> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Counters
// ---------------------------------------------------------------------------

/// Cumulative counters. Only ever incremented by the tick algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Counters {
    /// Completed parts.
    pub part_count: u64,
    /// Completed cycles.
    pub total_cycles: u64,
    /// Hours powered on.
    pub machine_on_hours: f64,
    /// Hours the working element (spindle, hydraulics, beam) was active.
    pub work_hours: f64,
}

impl Counters {
    /// Accrue `dt` seconds of power-on time, and of work time if `working`.
    pub fn accrue(&mut self, dt: f64, working: bool) {
        let hours = dt / SECONDS_PER_HOUR;
        self.machine_on_hours += hours;
        if working {
            self.work_hours += hours;
        }
    }

    /// Record one finished part.
    pub const fn finish_cycle(&mut self) {
        self.part_count = self.part_count.saturating_add(1);
        self.total_cycles = self.total_cycles.saturating_add(1);
    }
}

// ---------------------------------------------------------------------------
// Machine core
// ---------------------------------------------------------------------------

/// Phase timer, counters, and alarm slot common to all variants.
#[derive(Debug, Clone, PartialEq)]
pub struct MachineCore<P> {
    /// Phase and time in phase.
    pub timer: CycleTimer<P>,
    /// Cumulative counters.
    pub counters: Counters,
    alarm: Option<AlarmCode>,
}

impl<P: Phase> MachineCore<P> {
    /// A fresh core: idle, no alarm, zero counters.
    pub const fn new() -> Self {
        Self {
            timer: CycleTimer::new(),
            counters: Counters {
                part_count: 0,
                total_cycles: 0,
                machine_on_hours: 0.0,
                work_hours: 0.0,
            },
            alarm: None,
        }
    }

    /// Coarse status derived from the alarm slot and phase.
    pub fn execution(&self) -> ExecutionStatus {
        if self.alarm.is_some() {
            ExecutionStatus::Alarm
        } else if self.timer.phase() == P::IDLE {
            ExecutionStatus::Idle
        } else {
            ExecutionStatus::Running
        }
    }

    /// The active alarm, if any.
    pub const fn alarm(&self) -> Option<&AlarmCode> {
        self.alarm.as_ref()
    }

    /// Whether an alarm is active.
    pub const fn is_alarmed(&self) -> bool {
        self.alarm.is_some()
    }

    /// Common start of every tick: time passes in the phase and the
    /// usage counters accrue.
    pub fn begin_tick(&mut self, dt: f64, working: bool) {
        self.timer.advance(dt);
        self.counters.accrue(dt, working);
    }

    /// Stop on `code`, abandoning the cycle.
    pub fn raise(&mut self, code: AlarmCode) {
        self.alarm = Some(code);
        self.timer.enter(P::IDLE);
    }

    /// Clear the alarm, returning the code that was active.
    pub const fn clear(&mut self) -> Option<AlarmCode> {
        self.alarm.take()
    }
}

impl<P: Phase> Default for MachineCore<P> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

/// What happened to a machine during one tick.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TickOutcome {
    /// A part was finished this tick.
    pub part_finished: bool,
    /// An alarm was raised by the fault model this tick.
    pub alarm_raised: Option<AlarmCode>,
    /// An alarm cleared this tick.
    pub alarm_cleared: Option<AlarmCode>,
}

/// Unrounded view of a machine's state in dashboard terms.
///
/// [`crate::snapshot`] turns this into a rounded record.
#[derive(Debug, Clone, PartialEq)]
pub struct Readout {
    /// Cycle phase wire name.
    pub phase: &'static str,
    /// Seconds in the current phase.
    pub time_in_phase: f64,
    /// Coarse status.
    pub execution: ExecutionStatus,
    /// Active alarm.
    pub alarm: Option<AlarmCode>,
    /// Spindle speed in rpm.
    pub spindle_speed: f64,
    /// Load, tonnage, or power percentage.
    pub spindle_load: f64,
    /// Feed or stroke rate.
    pub feed_rate: f64,
    /// Axis positions.
    pub axes: AxisPositions,
    /// Spindle, oil, or resonator temperature.
    pub temperature: f64,
    /// Vibration level.
    pub vibration: f64,
    /// Estimated current in amps.
    pub current_amps: f64,
    /// Tool wear in `[0, 1]`.
    pub tool_wear: f64,
    /// Coolant level percentage.
    pub coolant_level: f64,
    /// Cumulative counters.
    pub counters: Counters,
    /// Raw variant values.
    pub telemetry: VariantTelemetry,
}

/// The capability every machine variant provides.
///
/// The set of implementors is closed; [`crate::Machine`] dispatches over
/// them with a `match`.
pub trait CycleModel {
    /// Which variant this is.
    const KIND: MachineKind;

    /// Advance the machine by `dt` simulated seconds.
    fn tick<R: Rng + ?Sized>(&mut self, dt: f64, rng: &mut R) -> TickOutcome;

    /// Force an alarm regardless of the current phase.
    fn inject_fault(&mut self, code: AlarmCode);

    /// Coarse status.
    fn execution(&self) -> ExecutionStatus;

    /// Active alarm, if any.
    fn alarm(&self) -> Option<&AlarmCode>;

    /// Unrounded dashboard view of the state.
    fn readout(&self) -> Readout;
}

/// Move `value` toward zero by `step`, never past it.
pub(crate) fn decay(value: f64, step: f64) -> f64 {
    (value - step).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum TestPhase {
        Idle,
        Busy,
    }

    impl Phase for TestPhase {
        const IDLE: Self = Self::Idle;

        fn as_str(self) -> &'static str {
            match self {
                Self::Idle => "IDLE",
                Self::Busy => "BUSY",
            }
        }
    }

    #[test]
    fn entering_same_phase_keeps_elapsed_time() {
        let mut timer = CycleTimer::<TestPhase>::new();
        timer.advance(0.4);
        assert!(!timer.enter(TestPhase::Idle));
        assert!((timer.time_in_phase() - 0.4).abs() < 1e-12);
        assert!(timer.enter(TestPhase::Busy));
        assert!(timer.time_in_phase().abs() < 1e-12);
    }

    #[test]
    fn accumulated_steps_reach_duration() {
        let mut timer = CycleTimer::<TestPhase>::new();
        for _ in 0..15 {
            timer.advance(0.2);
        }
        assert!(timer.elapsed(3.0));
    }

    #[test]
    fn execution_is_derived_from_alarm_and_phase() {
        let mut core = MachineCore::<TestPhase>::new();
        assert_eq!(core.execution(), ExecutionStatus::Idle);
        core.timer.enter(TestPhase::Busy);
        assert_eq!(core.execution(), ExecutionStatus::Running);
        core.raise(AlarmCode::Custom(String::from("X")));
        assert_eq!(core.execution(), ExecutionStatus::Alarm);
        assert_eq!(core.timer.phase(), TestPhase::Idle);
        assert!(core.clear().is_some());
        assert_eq!(core.execution(), ExecutionStatus::Idle);
    }

    #[test]
    fn counters_accrue_hours() {
        let mut counters = Counters::default();
        counters.accrue(1800.0, false);
        counters.accrue(1800.0, true);
        assert!((counters.machine_on_hours - 1.0).abs() < 1e-12);
        assert!((counters.work_hours - 0.5).abs() < 1e-12);
        counters.finish_cycle();
        assert_eq!(counters.part_count, 1);
        assert_eq!(counters.total_cycles, 1);
    }
}
