//! Fiber laser cutter cycle model.
//!
//! `IDLE -> PIERCE -> CUTTING -> TRAVEL -> DWELL -> FINISH -> IDLE`, with
//! phase changes driven purely by elapsed time. The resonator heats while
//! cutting and can overheat; assist gas pressure bleeds down slowly.

use rand::Rng;
use serde::Deserialize;
use shopfloor_types::{AxisPositions, ExecutionStatus, MachineKind, VariantTelemetry};

use crate::alarm::AlarmCode;
use crate::cycle::{CycleModel, MachineCore, Phase, Readout, TickOutcome, decay};
use crate::error::MachineError;
use crate::odds::{LaserOdds, chance};

const IDLE_POWER_DECAY: f64 = 2.5;
const PIERCE_POWER_RATE: f64 = 4.0;
const CUT_FEED_RAMP: f64 = 300.0;
const TRAVEL_POWER_DECAY: f64 = 5.0;

const PIERCE_SECONDS: f64 = 2.0;
const CUTTING_SECONDS: f64 = 8.0;
const TRAVEL_SECONDS: f64 = 3.0;
const DWELL_SECONDS: f64 = 2.0;

/// Lowest power a cut is ever programmed at, in kilowatts.
const MIN_TARGET_POWER: f64 = 2.0;

const RESONATOR_RISE_AT_FULL_POWER: f64 = 2.0;
const RESONATOR_COOLING: f64 = 0.25;
const RESONATOR_MIN: f64 = 26.0;
const RESONATOR_MAX: f64 = 95.0;
const RESONATOR_OVERHEAT_THRESHOLD: f64 = 85.0;
const RESONATOR_AFTER_RECOVERY: f64 = 50.0;

const GAS_INITIAL: f64 = 240.0;
const GAS_DRAIN: f64 = 0.5;
const GAS_MIN: f64 = 100.0;

const CURRENT_BASE: f64 = 15.0;
const CURRENT_PER_LOAD: f64 = 0.2;

/// Rated source power of a laser cutter.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LaserLimits {
    /// Maximum beam power in kilowatts.
    #[serde(default = "default_max_power_kw")]
    pub max_power_kw: f64,
}

const fn default_max_power_kw() -> f64 {
    6.0
}

impl Default for LaserLimits {
    fn default() -> Self {
        Self {
            max_power_kw: default_max_power_kw(),
        }
    }
}

impl LaserLimits {
    /// The source must be able to exceed the lowest programmed cut power.
    ///
    /// # Errors
    ///
    /// Returns [`MachineError::InvalidLimits`] otherwise.
    pub fn validate(&self) -> Result<(), MachineError> {
        if self.max_power_kw.is_finite() && self.max_power_kw > MIN_TARGET_POWER {
            Ok(())
        } else {
            Err(MachineError::InvalidLimits {
                reason: format!(
                    "max power {} kW must exceed {MIN_TARGET_POWER} kW",
                    self.max_power_kw
                ),
            })
        }
    }
}

/// Laser cycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaserPhase {
    /// Beam off, waiting for a job.
    Idle,
    /// Burning through the sheet.
    Pierce,
    /// Following the contour.
    Cutting,
    /// Beam off, moving to the next contour.
    Travel,
    /// Pause before the part is released.
    Dwell,
    /// Part complete; lasts a single tick.
    Finish,
}

impl Phase for LaserPhase {
    const IDLE: Self = Self::Idle;

    fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Pierce => "PIERCE",
            Self::Cutting => "CUTTING",
            Self::Travel => "TRAVEL",
            Self::Dwell => "DWELL",
            Self::Finish => "FINISH",
        }
    }
}

/// A fiber laser cutter.
#[derive(Debug, Clone, PartialEq)]
pub struct LaserMachine {
    core: MachineCore<LaserPhase>,
    limits: LaserLimits,
    odds: LaserOdds,
    power_kw: f64,
    target_power_kw: f64,
    cut_feed: f64,
    target_cut_feed: f64,
    temp_resonator: f64,
    gas_pressure: f64,
}

impl LaserMachine {
    /// Build an idle laser with a cold resonator and a full gas supply.
    ///
    /// # Errors
    ///
    /// Returns [`MachineError`] if the limits or odds are invalid.
    pub fn new(limits: LaserLimits, odds: LaserOdds) -> Result<Self, MachineError> {
        limits.validate()?;
        odds.validate()?;
        Ok(Self {
            core: MachineCore::new(),
            limits,
            odds,
            power_kw: 0.0,
            target_power_kw: 0.0,
            cut_feed: 0.0,
            target_cut_feed: 0.0,
            temp_resonator: RESONATOR_MIN,
            gas_pressure: GAS_INITIAL,
        })
    }

    /// Current cycle phase.
    pub const fn phase(&self) -> LaserPhase {
        self.core.timer.phase()
    }

    /// Draw target power and feed and start piercing. Only starts from idle.
    pub fn start_cycle<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        if self.core.execution() != ExecutionStatus::Idle {
            return false;
        }
        self.target_power_kw = rng.random_range(MIN_TARGET_POWER..=self.limits.max_power_kw);
        self.target_cut_feed = f64::from(rng.random_range(800_u32..=3000));
        self.core.timer.enter(LaserPhase::Pierce)
    }

    fn step_phase<R: Rng + ?Sized>(&mut self, dt: f64, rng: &mut R) -> bool {
        match self.phase() {
            LaserPhase::Idle => {
                self.power_kw = decay(self.power_kw, IDLE_POWER_DECAY * dt);
                self.cut_feed = 0.0;
                if chance(rng, self.odds.cycle_start) {
                    self.start_cycle(rng);
                }
            }
            LaserPhase::Pierce => {
                self.power_kw = PIERCE_POWER_RATE
                    .mul_add(dt, self.power_kw)
                    .min(self.target_power_kw);
                if self.core.timer.elapsed(PIERCE_SECONDS) {
                    self.core.timer.enter(LaserPhase::Cutting);
                }
            }
            LaserPhase::Cutting => {
                if self.cut_feed < self.target_cut_feed {
                    self.cut_feed = CUT_FEED_RAMP
                        .mul_add(dt, self.cut_feed)
                        .min(self.target_cut_feed);
                }
                let rise = self.power_fraction() * RESONATOR_RISE_AT_FULL_POWER;
                self.temp_resonator = rise.mul_add(dt, self.temp_resonator).min(RESONATOR_MAX);
                if self.core.timer.elapsed(CUTTING_SECONDS) {
                    self.core.timer.enter(LaserPhase::Travel);
                }
            }
            LaserPhase::Travel => {
                self.power_kw = decay(self.power_kw, TRAVEL_POWER_DECAY * dt);
                self.cut_feed = self.target_cut_feed;
                if self.core.timer.elapsed(TRAVEL_SECONDS) {
                    self.core.timer.enter(LaserPhase::Dwell);
                }
            }
            LaserPhase::Dwell => {
                self.cut_feed = 0.0;
                if self.core.timer.elapsed(DWELL_SECONDS) {
                    self.core.timer.enter(LaserPhase::Finish);
                }
            }
            LaserPhase::Finish => {
                self.core.counters.finish_cycle();
                self.core.timer.enter(LaserPhase::Idle);
                return true;
            }
        }
        false
    }

    fn power_fraction(&self) -> f64 {
        self.power_kw / self.limits.max_power_kw
    }

    fn load(&self) -> f64 {
        (self.power_fraction() * 100.0).min(100.0)
    }

    /// Resonator cooling and gas bleed-down, applied every tick.
    fn ancillary(&mut self, dt: f64) {
        self.temp_resonator = RESONATOR_COOLING
            .mul_add(-dt, self.temp_resonator)
            .clamp(RESONATOR_MIN, RESONATOR_MAX);
        self.gas_pressure = GAS_DRAIN.mul_add(-dt, self.gas_pressure).max(GAS_MIN);
    }
}

impl CycleModel for LaserMachine {
    const KIND: MachineKind = MachineKind::Laser;

    fn tick<R: Rng + ?Sized>(&mut self, dt: f64, rng: &mut R) -> TickOutcome {
        let beam_working = self.core.execution() == ExecutionStatus::Running;
        self.core.begin_tick(dt, beam_working);

        let mut outcome = TickOutcome::default();
        if self.core.is_alarmed() {
            self.ancillary(dt);
            if chance(rng, self.odds.recovery) {
                outcome.alarm_cleared = self.core.clear();
                self.temp_resonator = RESONATOR_AFTER_RECOVERY;
            }
            return outcome;
        }

        outcome.part_finished = self.step_phase(dt, rng);
        self.ancillary(dt);
        if self.temp_resonator > RESONATOR_OVERHEAT_THRESHOLD
            && chance(rng, self.odds.resonator_overheat)
        {
            self.core.raise(AlarmCode::ResonatorOverheat);
            outcome.alarm_raised = Some(AlarmCode::ResonatorOverheat);
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
        let load = self.load();
        Readout {
            phase: self.phase().as_str(),
            time_in_phase: self.core.timer.time_in_phase(),
            execution: self.core.execution(),
            alarm: self.core.alarm().cloned(),
            spindle_speed: 0.0,
            spindle_load: load,
            feed_rate: self.cut_feed,
            axes: AxisPositions::default(),
            temperature: self.temp_resonator,
            vibration: 0.0,
            current_amps: CURRENT_PER_LOAD.mul_add(load, CURRENT_BASE),
            tool_wear: 0.0,
            coolant_level: 100.0,
            counters: self.core.counters,
            telemetry: VariantTelemetry::Laser {
                power_kw: self.power_kw,
                target_power_kw: self.target_power_kw,
                max_power_kw: self.limits.max_power_kw,
                cut_feed: self.cut_feed,
                temp_resonator: self.temp_resonator,
                gas_pressure: self.gas_pressure,
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const DT: f64 = 0.2;

    fn quiet_laser() -> LaserMachine {
        LaserMachine::new(LaserLimits::default(), LaserOdds::quiet(0.0)).unwrap()
    }

    #[test]
    fn rejects_source_below_minimum_cut_power() {
        let limits = LaserLimits { max_power_kw: 1.5 };
        assert!(LaserMachine::new(limits, LaserOdds::default()).is_err());
    }

    #[test]
    fn cycle_is_time_driven() {
        let mut rng = StdRng::seed_from_u64(17);
        let mut laser = quiet_laser();
        assert!(laser.start_cycle(&mut rng));

        let mut ticks = 0;
        let mut finished = 0;
        while laser.phase() != LaserPhase::Idle {
            if laser.tick(DT, &mut rng).part_finished {
                finished += 1;
            }
            ticks += 1;
            assert!(ticks < 200);
        }

        // 2 s pierce + 8 s cutting + 3 s travel + 2 s dwell, then one FINISH tick.
        assert_eq!(ticks, 76);
        assert_eq!(finished, 1);
        assert_eq!(laser.readout().counters.total_cycles, 1);
    }

    #[test]
    fn cutting_heats_resonator_and_ramps_feed() {
        let mut rng = StdRng::seed_from_u64(23);
        let mut laser = quiet_laser();
        laser.start_cycle(&mut rng);
        while laser.phase() != LaserPhase::Travel {
            laser.tick(DT, &mut rng);
        }
        assert!(laser.temp_resonator > 26.0);
        assert!(laser.cut_feed > 0.0 && laser.cut_feed <= laser.target_cut_feed);
        assert!(laser.power_kw <= laser.target_power_kw);
    }

    #[test]
    fn gas_pressure_bleeds_to_floor() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut laser = quiet_laser();
        for _ in 0..2000 {
            laser.tick(DT, &mut rng);
        }
        assert_eq!(laser.gas_pressure, 100.0);
    }

    #[test]
    fn recovery_resets_resonator_temperature() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut odds = LaserOdds::quiet(0.0);
        odds.recovery = 1.0;
        let mut laser = LaserMachine::new(LaserLimits::default(), odds).unwrap();
        laser.temp_resonator = 90.0;
        laser.inject_fault(AlarmCode::ResonatorOverheat);

        let outcome = laser.tick(DT, &mut rng);
        assert_eq!(outcome.alarm_cleared, Some(AlarmCode::ResonatorOverheat));
        assert_eq!(laser.temp_resonator, 50.0);
        assert!(laser.alarm().is_none());
    }

    #[test]
    fn quantities_stay_in_bounds() {
        let odds = LaserOdds {
            cycle_start: 0.5,
            resonator_overheat: 0.3,
            recovery: 0.1,
        };
        for seed in 0..8 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut laser = LaserMachine::new(LaserLimits::default(), odds).unwrap();
            for _ in 0..5000 {
                laser.tick(DT, &mut rng);
                let r = laser.readout();
                assert!((0.0..=100.0).contains(&r.spindle_load));
                assert!((26.0..=95.0).contains(&r.temperature));
                assert_eq!(r.alarm.is_some(), r.execution == ExecutionStatus::Alarm);
            }
        }
    }
}
