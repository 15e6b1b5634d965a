//! CNC mill/lathe cycle model.
//!
//! One working cycle runs through
//! `IDLE -> SPINDLE_RAMP -> RAPID -> CUTTING -> RETRACT -> DWELL -> FINISH -> IDLE`.
//! Spindle load is a blend of feed, tool wear, vibration, and noise, and
//! feeds back into spindle temperature, which together with coolant level
//! drives the three fault checks.

use rand::Rng;
use serde::Deserialize;
use shopfloor_types::{AxisPositions, ExecutionStatus, MachineKind, VariantTelemetry};

use crate::alarm::AlarmCode;
use crate::cycle::{CycleModel, MachineCore, Phase, Readout, TickOutcome, decay};
use crate::error::MachineError;
use crate::odds::{CncOdds, chance};

// Idle braking, per second.
const IDLE_SPINDLE_DECAY: f64 = 500.0;
const IDLE_FEED_DECAY: f64 = 500.0;

const SPINDLE_RAMP_RATE: f64 = 350.0;
const FEED_RAMP_RATE: f64 = 200.0;
const Z_DESCENT_RATE: f64 = 1.0;
const Z_RETRACT_RATE: f64 = 4.0;
const DWELL_LOAD_DECAY: f64 = 5.0;
const FINISH_LOAD_FACTOR: f64 = 0.7;

const RAPID_SECONDS: f64 = 3.0;
const DWELL_SECONDS: f64 = 2.0;
/// Fraction of the drawn cut time actually spent in `CUTTING`.
const CUTTING_FRACTION: f64 = 0.6;

/// Cutting never takes Z closer than this to the lower travel limit.
const Z_CUT_MARGIN: f64 = 5.0;
/// Retract stops this far below the upper travel limit.
const Z_RETRACT_MARGIN: f64 = 10.0;

// Spindle load model.
const FEED_REFERENCE: f64 = 1800.0;
const FEED_LOAD_WEIGHT: f64 = 35.0;
const WEAR_LOAD_WEIGHT: f64 = 50.0;
const VIBRATION_LOAD_WEIGHT: f64 = 8.0;
const LOAD_NOISE_MIN: f64 = -2.0;
const LOAD_NOISE_MAX: f64 = 2.5;
const WEAR_PER_LOAD_SECOND: f64 = 1.0 / 50_000.0;
const VIBRATION_PER_WEAR: f64 = 3.0;
const VIBRATION_NOISE_MAX: f64 = 0.4;

// Ancillary physics, per second.
const COOLANT_DRAIN: f64 = 0.1;
const TEMP_RISE_AT_FULL_LOAD: f64 = 0.75;
const TEMP_COOLING: f64 = 0.15;
const TEMP_MIN: f64 = 25.0;
const TEMP_MAX: f64 = 95.0;
const CURRENT_BASE: f64 = 7.0;
const CURRENT_PER_LOAD: f64 = 0.12;
const SPINDLE_HOURS_MIN_RPM: f64 = 300.0;

// Fault thresholds.
const OVERLOAD_THRESHOLD: f64 = 95.0;
const THERMAL_THRESHOLD: f64 = 85.0;
const LOW_COOLANT_THRESHOLD: f64 = 15.0;

/// Full tank, in percent.
const COOLANT_FULL: f64 = 100.0;

/// Travel limits of one linear axis, in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct AxisRange {
    /// Lower travel limit.
    pub min: f64,
    /// Upper travel limit.
    pub max: f64,
}

impl AxisRange {
    /// Build a range from its limits.
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    fn midpoint(self) -> f64 {
        (self.min + self.max) / 2.0
    }

    fn validate(self, axis: &str) -> Result<(), MachineError> {
        if self.min.is_finite() && self.max.is_finite() && self.min < self.max {
            Ok(())
        } else {
            Err(MachineError::InvalidLimits {
                reason: format!("{axis} axis range {} .. {} is not ordered", self.min, self.max),
            })
        }
    }
}

/// Physical limits of a CNC machine.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct CncLimits {
    /// Rated spindle power in horsepower.
    pub spindle_power_hp: f64,
    /// X axis travel.
    pub x: AxisRange,
    /// Y axis travel.
    pub y: AxisRange,
    /// Z axis travel.
    pub z: AxisRange,
}

impl CncLimits {
    /// Check the axis ranges are ordered and Z leaves room for the
    /// cutting and retract margins.
    ///
    /// # Errors
    ///
    /// Returns [`MachineError::InvalidLimits`] describing the first problem.
    pub fn validate(&self) -> Result<(), MachineError> {
        if !(self.spindle_power_hp.is_finite() && self.spindle_power_hp > 0.0) {
            return Err(MachineError::InvalidLimits {
                reason: format!("spindle power {} hp must be positive", self.spindle_power_hp),
            });
        }
        self.x.validate("X")?;
        self.y.validate("Y")?;
        self.z.validate("Z")?;
        let travel = self.z.max - self.z.min;
        if travel <= Z_CUT_MARGIN + Z_RETRACT_MARGIN {
            return Err(MachineError::InvalidLimits {
                reason: format!(
                    "Z travel {travel} mm must exceed {} mm of safety margins",
                    Z_CUT_MARGIN + Z_RETRACT_MARGIN
                ),
            });
        }
        Ok(())
    }
}

/// CNC cycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CncPhase {
    /// Waiting for a program.
    Idle,
    /// Spindle accelerating to the programmed speed.
    SpindleRamp,
    /// Rapid positioning above the part.
    Rapid,
    /// Tool in the material.
    Cutting,
    /// Tool withdrawing.
    Retract,
    /// Short pause before the part is released.
    Dwell,
    /// Part complete; lasts a single tick.
    Finish,
}

impl Phase for CncPhase {
    const IDLE: Self = Self::Idle;

    fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::SpindleRamp => "SPINDLE_RAMP",
            Self::Rapid => "RAPID",
            Self::Cutting => "CUTTING",
            Self::Retract => "RETRACT",
            Self::Dwell => "DWELL",
            Self::Finish => "FINISH",
        }
    }
}

/// A CNC mill or lathe.
#[derive(Debug, Clone, PartialEq)]
pub struct CncMachine {
    core: MachineCore<CncPhase>,
    limits: CncLimits,
    odds: CncOdds,
    spindle_speed: f64,
    target_spindle_speed: f64,
    feed_rate: f64,
    target_feed: f64,
    /// Drawn cut time for the current cycle, seconds.
    cut_time: f64,
    spindle_load: f64,
    axes: AxisPositions,
    tool_wear: f64,
    vibration: f64,
    temp_spindle: f64,
    coolant_level: f64,
}

impl CncMachine {
    /// Build an idle machine with axes parked at X/Y centre and Z up.
    ///
    /// # Errors
    ///
    /// Returns [`MachineError`] if the limits or odds are invalid.
    pub fn new(limits: CncLimits, odds: CncOdds) -> Result<Self, MachineError> {
        limits.validate()?;
        odds.validate()?;
        Ok(Self {
            core: MachineCore::new(),
            limits,
            odds,
            spindle_speed: 0.0,
            target_spindle_speed: 0.0,
            feed_rate: 0.0,
            target_feed: 0.0,
            cut_time: 0.0,
            spindle_load: 0.0,
            axes: AxisPositions {
                x: limits.x.midpoint(),
                y: limits.y.midpoint(),
                z: limits.z.max,
            },
            tool_wear: 0.0,
            vibration: 0.0,
            temp_spindle: TEMP_MIN,
            coolant_level: COOLANT_FULL,
        })
    }

    /// Current cycle phase.
    pub const fn phase(&self) -> CncPhase {
        self.core.timer.phase()
    }

    /// The configured limits.
    pub const fn limits(&self) -> &CncLimits {
        &self.limits
    }

    /// Load a new program: draw targets and enter `SPINDLE_RAMP`.
    ///
    /// Does nothing unless the machine is idle and not alarmed. Returns
    /// whether a cycle started.
    pub fn start_cycle<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        if self.core.execution() != ExecutionStatus::Idle {
            return false;
        }
        self.target_spindle_speed = f64::from(rng.random_range(4000_u32..=9000));
        self.target_feed = f64::from(rng.random_range(300_u32..=1800));
        self.cut_time = f64::from(rng.random_range(20_u32..=45));
        self.core.timer.enter(CncPhase::SpindleRamp)
    }

    fn step_phase<R: Rng + ?Sized>(&mut self, dt: f64, rng: &mut R) -> bool {
        match self.phase() {
            CncPhase::Idle => {
                self.spindle_speed = decay(self.spindle_speed, IDLE_SPINDLE_DECAY * dt);
                self.feed_rate = decay(self.feed_rate, IDLE_FEED_DECAY * dt);
                if chance(rng, self.odds.cycle_start) {
                    self.start_cycle(rng);
                }
            }
            CncPhase::SpindleRamp => {
                self.spindle_speed += SPINDLE_RAMP_RATE * dt;
                if self.spindle_speed >= self.target_spindle_speed {
                    self.spindle_speed = self.target_spindle_speed;
                    self.core.timer.enter(CncPhase::Rapid);
                }
            }
            CncPhase::Rapid => {
                self.axes.x = rng.random_range(self.limits.x.min..=self.limits.x.max);
                self.axes.y = rng.random_range(self.limits.y.min..=self.limits.y.max);
                self.axes.z = self.limits.z.max;
                self.feed_rate = 0.0;
                if self.core.timer.elapsed(RAPID_SECONDS) {
                    self.core.timer.enter(CncPhase::Cutting);
                }
            }
            CncPhase::Cutting => self.cut(dt, rng),
            CncPhase::Retract => {
                let top = self.limits.z.max - Z_RETRACT_MARGIN;
                self.axes.z += Z_RETRACT_RATE * dt;
                if self.axes.z >= top {
                    self.axes.z = top;
                    self.core.timer.enter(CncPhase::Dwell);
                }
            }
            CncPhase::Dwell => {
                self.feed_rate = 0.0;
                self.spindle_load = decay(self.spindle_load, DWELL_LOAD_DECAY * dt);
                if self.core.timer.elapsed(DWELL_SECONDS) {
                    self.core.timer.enter(CncPhase::Finish);
                }
            }
            CncPhase::Finish => {
                self.core.counters.finish_cycle();
                self.spindle_load *= FINISH_LOAD_FACTOR;
                self.feed_rate = 0.0;
                self.core.timer.enter(CncPhase::Idle);
                return true;
            }
        }
        false
    }

    fn cut<R: Rng + ?Sized>(&mut self, dt: f64, rng: &mut R) {
        if self.feed_rate < self.target_feed {
            self.feed_rate = (self.feed_rate + FEED_RAMP_RATE * dt).min(self.target_feed);
        }

        let feed_fraction = self.feed_rate / self.target_feed.max(1.0);
        let floor = self.limits.z.min + Z_CUT_MARGIN;
        self.axes.z = (self.axes.z - Z_DESCENT_RATE * dt * feed_fraction).max(floor);

        let base = self.feed_rate / FEED_REFERENCE * FEED_LOAD_WEIGHT;
        let noise = rng.random_range(LOAD_NOISE_MIN..=LOAD_NOISE_MAX);
        let load = VIBRATION_LOAD_WEIGHT.mul_add(
            self.vibration,
            WEAR_LOAD_WEIGHT.mul_add(self.tool_wear, base),
        ) + noise;
        self.spindle_load = load.clamp(0.0, 100.0);

        self.tool_wear = (self.spindle_load * WEAR_PER_LOAD_SECOND)
            .mul_add(dt, self.tool_wear)
            .min(1.0);
        self.vibration = VIBRATION_PER_WEAR
            .mul_add(self.tool_wear, rng.random_range(0.0..=VIBRATION_NOISE_MAX));

        if self.core.timer.elapsed(self.cut_time * CUTTING_FRACTION) {
            self.core.timer.enter(CncPhase::Retract);
        }
    }

    fn check_faults<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<AlarmCode> {
        let code = if self.spindle_load > OVERLOAD_THRESHOLD
            && chance(rng, self.odds.spindle_overload)
        {
            AlarmCode::SpindleOverload
        } else if self.temp_spindle > THERMAL_THRESHOLD && chance(rng, self.odds.spindle_thermal)
        {
            AlarmCode::SpindleThermal
        } else if self.coolant_level < LOW_COOLANT_THRESHOLD && chance(rng, self.odds.low_coolant)
        {
            AlarmCode::LowCoolant
        } else {
            return None;
        };
        self.core.raise(code.clone());
        Some(code)
    }

    fn ancillary(&mut self, dt: f64) {
        self.coolant_level = decay(self.coolant_level, COOLANT_DRAIN * dt);
        let rise = self.spindle_load / 100.0 * TEMP_RISE_AT_FULL_LOAD;
        self.temp_spindle = ((rise - TEMP_COOLING).mul_add(dt, self.temp_spindle))
            .clamp(TEMP_MIN, TEMP_MAX);
    }

    fn current_amps(&self) -> f64 {
        CURRENT_PER_LOAD.mul_add(self.spindle_load, CURRENT_BASE)
    }
}

impl CycleModel for CncMachine {
    const KIND: MachineKind = MachineKind::Cnc;

    fn tick<R: Rng + ?Sized>(&mut self, dt: f64, rng: &mut R) -> TickOutcome {
        let spindle_turning = self.spindle_speed > SPINDLE_HOURS_MIN_RPM;
        self.core.begin_tick(dt, spindle_turning);
        self.ancillary(dt);

        let mut outcome = TickOutcome::default();
        if self.core.is_alarmed() {
            if chance(rng, self.odds.recovery) {
                let cleared = self.core.clear();
                if cleared == Some(AlarmCode::LowCoolant) {
                    self.coolant_level = COOLANT_FULL;
                }
                outcome.alarm_cleared = cleared;
            }
            return outcome;
        }

        outcome.part_finished = self.step_phase(dt, rng);
        outcome.alarm_raised = self.check_faults(rng);
        outcome
    }

    fn inject_fault(&mut self, code: AlarmCode) {
        self.core.raise(code);
    }

    fn execution(&self) -> ExecutionStatus {
        self.core.execution()
    }

    fn alarm(&self) -> Option<&AlarmCode> {
        self.core.alarm()
    }

    fn readout(&self) -> Readout {
        Readout {
            phase: self.phase().as_str(),
            time_in_phase: self.core.timer.time_in_phase(),
            execution: self.core.execution(),
            alarm: self.core.alarm().cloned(),
            spindle_speed: self.spindle_speed,
            spindle_load: self.spindle_load,
            feed_rate: self.feed_rate,
            axes: self.axes,
            temperature: self.temp_spindle,
            vibration: self.vibration,
            current_amps: self.current_amps(),
            tool_wear: self.tool_wear,
            coolant_level: self.coolant_level,
            counters: self.core.counters,
            telemetry: VariantTelemetry::Cnc {
                spindle_power_hp: self.limits.spindle_power_hp,
                target_spindle_speed: self.target_spindle_speed,
                target_feed: self.target_feed,
            },
        }
    }
}
