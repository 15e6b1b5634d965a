//! Hydraulic press brake cycle model.
//!
//! `IDLE -> APPROACH -> BEND -> HOLD -> RETURN -> DWELL -> FINISH -> IDLE`.
//! The ram position runs from 0 (top) to 100 (full stroke). Oil
//! temperature follows the tonnage fraction and is the only fault source.

use rand::Rng;
use serde::Deserialize;
use shopfloor_types::{AxisPositions, ExecutionStatus, MachineKind, VariantTelemetry};

use crate::alarm::AlarmCode;
use crate::cycle::{CycleModel, MachineCore, Phase, Readout, TickOutcome, decay};
use crate::error::MachineError;
use crate::odds::{PressBrakeOdds, chance};

const IDLE_TONNAGE_DECAY: f64 = 10.0;
const IDLE_RAM_DECAY: f64 = 15.0;
const APPROACH_RAM_RATE: f64 = 40.0;
const APPROACH_TONNAGE_DECAY: f64 = 5.0;
const BEND_RAM_RATE: f64 = 10.0;
const BEND_TONNAGE_RATE: f64 = 40.0;
const RETURN_RAM_RATE: f64 = 50.0;
const RETURN_TONNAGE_DECAY: f64 = 60.0;

/// Ram position where bending starts.
const BEND_START: f64 = 80.0;
const FULL_STROKE: f64 = 100.0;

const HOLD_SECONDS: f64 = 1.5;
const DWELL_SECONDS: f64 = 1.0;

const TARGET_MIN_FRACTION: f64 = 0.3;
const TARGET_MAX_FRACTION: f64 = 0.9;

const OIL_RISE_AT_FULL_TONNAGE: f64 = 2.0;
const OIL_COOLING: f64 = 0.15;
const OIL_MIN: f64 = 30.0;
const OIL_MAX: f64 = 95.0;
const OIL_INITIAL: f64 = 32.0;
const OIL_OVERHEAT_THRESHOLD: f64 = 75.0;
const OIL_AFTER_RECOVERY: f64 = 45.0;

/// Nominal stroke rate reported as feed while running.
const STROKES_PER_MINUTE: f64 = 30.0;
const CURRENT_BASE: f64 = 10.0;
const CURRENT_PER_LOAD: f64 = 0.1;

/// Rated capacity of a press brake.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PressBrakeLimits {
    /// Maximum bending force in tonnes.
    #[serde(default = "default_max_tonnage")]
    pub max_tonnage: f64,
}

const fn default_max_tonnage() -> f64 {
    160.0
}

impl Default for PressBrakeLimits {
    fn default() -> Self {
        Self {
            max_tonnage: default_max_tonnage(),
        }
    }
}

impl PressBrakeLimits {
    /// Check the capacity is a positive number.
    ///
    /// # Errors
    ///
    /// Returns [`MachineError::InvalidLimits`] otherwise.
    pub fn validate(&self) -> Result<(), MachineError> {
        if self.max_tonnage.is_finite() && self.max_tonnage > 0.0 {
            Ok(())
        } else {
            Err(MachineError::InvalidLimits {
                reason: format!("max tonnage {} must be positive", self.max_tonnage),
            })
        }
    }
}

/// Press brake cycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressBrakePhase {
    /// Ram parked at the top.
    Idle,
    /// Fast descent with no force.
    Approach,
    /// Force building toward the target.
    Bend,
    /// Holding force at the bottom.
    Hold,
    /// Ram retracting.
    Return,
    /// Pause before the part is released.
    Dwell,
    /// Bend complete; lasts a single tick.
    Finish,
}

impl Phase for PressBrakePhase {
    const IDLE: Self = Self::Idle;

    fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Approach => "APPROACH",
            Self::Bend => "BEND",
            Self::Hold => "HOLD",
            Self::Return => "RETURN",
            Self::Dwell => "DWELL",
            Self::Finish => "FINISH",
        }
    }
}

/// A hydraulic press brake.
#[derive(Debug, Clone, PartialEq)]
pub struct PressBrakeMachine {
    core: MachineCore<PressBrakePhase>,
    limits: PressBrakeLimits,
    odds: PressBrakeOdds,
    tonnage: f64,
    target_tonnage: f64,
    ram_position: f64,
    oil_temp: f64,
    cycle_count: u64,
}

impl PressBrakeMachine {
    /// Build an idle press with the ram at the top.
    ///
    /// # Errors
    ///
    /// Returns [`MachineError`] if the limits or odds are invalid.
    pub fn new(limits: PressBrakeLimits, odds: PressBrakeOdds) -> Result<Self, MachineError> {
        limits.validate()?;
        odds.validate()?;
        Ok(Self {
            core: MachineCore::new(),
            limits,
            odds,
            tonnage: 0.0,
            target_tonnage: 0.0,
            ram_position: 0.0,
            oil_temp: OIL_INITIAL,
            cycle_count: 0,
        })
    }

    /// Current cycle phase.
    pub const fn phase(&self) -> PressBrakePhase {
        self.core.timer.phase()
    }

    /// Draw a target force and begin the approach. Only starts from idle.
    pub fn start_cycle<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        if self.core.execution() != ExecutionStatus::Idle {
            return false;
        }
        let max = self.limits.max_tonnage;
        self.target_tonnage =
            rng.random_range(max * TARGET_MIN_FRACTION..=max * TARGET_MAX_FRACTION);
        self.core.timer.enter(PressBrakePhase::Approach)
    }

    fn step_phase<R: Rng + ?Sized>(&mut self, dt: f64, rng: &mut R) -> bool {
        match self.phase() {
            PressBrakePhase::Idle => {
                self.tonnage = decay(self.tonnage, IDLE_TONNAGE_DECAY * dt);
                self.ram_position = decay(self.ram_position, IDLE_RAM_DECAY * dt);
                if chance(rng, self.odds.cycle_start) {
                    self.start_cycle(rng);
                }
            }
            PressBrakePhase::Approach => {
                self.ram_position += APPROACH_RAM_RATE * dt;
                self.tonnage = decay(self.tonnage, APPROACH_TONNAGE_DECAY * dt);
                if self.ram_position >= BEND_START {
                    self.ram_position = BEND_START;
                    self.core.timer.enter(PressBrakePhase::Bend);
                }
            }
            PressBrakePhase::Bend => {
                self.ram_position = BEND_RAM_RATE.mul_add(dt, self.ram_position).min(FULL_STROKE);
                self.tonnage += BEND_TONNAGE_RATE * dt;
                if self.tonnage >= self.target_tonnage {
                    self.tonnage = self.target_tonnage;
                    self.core.timer.enter(PressBrakePhase::Hold);
                }
            }
            PressBrakePhase::Hold => {
                if self.core.timer.elapsed(HOLD_SECONDS) {
                    self.core.timer.enter(PressBrakePhase::Return);
                }
            }
            PressBrakePhase::Return => {
                self.ram_position -= RETURN_RAM_RATE * dt;
                self.tonnage = decay(self.tonnage, RETURN_TONNAGE_DECAY * dt);
                if self.ram_position <= 0.0 {
                    self.ram_position = 0.0;
                    self.core.timer.enter(PressBrakePhase::Dwell);
                }
            }
            PressBrakePhase::Dwell => {
                if self.core.timer.elapsed(DWELL_SECONDS) {
                    self.core.timer.enter(PressBrakePhase::Finish);
                }
            }
            PressBrakePhase::Finish => {
                self.cycle_count = self.cycle_count.saturating_add(1);
                self.core.counters.finish_cycle();
                self.core.timer.enter(PressBrakePhase::Idle);
                return true;
            }
        }
        false
    }

    /// Oil heats with the tonnage fraction and sheds heat constantly.
    fn update_oil_temp(&mut self, dt: f64) {
        let rise = self.tonnage_fraction() * OIL_RISE_AT_FULL_TONNAGE;
        self.oil_temp = (rise - OIL_COOLING)
            .mul_add(dt, self.oil_temp)
            .clamp(OIL_MIN, OIL_MAX);
    }

    fn tonnage_fraction(&self) -> f64 {
        self.tonnage / self.limits.max_tonnage
    }

    fn load(&self) -> f64 {
        (self.tonnage_fraction() * 100.0).min(100.0)
    }
}

impl CycleModel for PressBrakeMachine {
    const KIND: MachineKind = MachineKind::PressBrake;

    fn tick<R: Rng + ?Sized>(&mut self, dt: f64, rng: &mut R) -> TickOutcome {
        let hydraulics_working = self.core.execution() == ExecutionStatus::Running;
        self.core.begin_tick(dt, hydraulics_working);

        let mut outcome = TickOutcome::default();
        if self.core.is_alarmed() {
            self.update_oil_temp(dt);
            if chance(rng, self.odds.recovery) {
                outcome.alarm_cleared = self.core.clear();
                self.oil_temp = OIL_AFTER_RECOVERY;
            }
            return outcome;
        }

        outcome.part_finished = self.step_phase(dt, rng);
        self.update_oil_temp(dt);
        if self.oil_temp > OIL_OVERHEAT_THRESHOLD && chance(rng, self.odds.oil_overheat) {
            self.core.raise(AlarmCode::OilOverheat);
            outcome.alarm_raised = Some(AlarmCode::OilOverheat);
        }
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
        let execution = self.core.execution();
        let load = self.load();
        Readout {
            phase: self.phase().as_str(),
            time_in_phase: self.core.timer.time_in_phase(),
            execution,
            alarm: self.core.alarm().cloned(),
            spindle_speed: 0.0,
            spindle_load: load,
            feed_rate: if execution == ExecutionStatus::Running {
                STROKES_PER_MINUTE
            } else {
                0.0
            },
            axes: AxisPositions {
                x: 0.0,
                y: 0.0,
                z: self.ram_position,
            },
            temperature: self.oil_temp,
            vibration: 0.0,
            current_amps: CURRENT_PER_LOAD.mul_add(load, CURRENT_BASE),
            tool_wear: 0.0,
            coolant_level: 100.0,
            counters: self.core.counters,
            telemetry: VariantTelemetry::PressBrake {
                tonnage: self.tonnage,
                target_tonnage: self.target_tonnage,
                max_tonnage: self.limits.max_tonnage,
                ram_position: self.ram_position,
                oil_temp: self.oil_temp,
                cycle_count: self.cycle_count,
            },
        }
    }
}
