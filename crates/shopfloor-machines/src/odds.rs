//! Per-tick probabilities for cycle starts, fault onset, and recovery.
//!
//! Randomness is control flow in this simulator: a machine leaves idle,
//! trips an alarm, or recovers from one on a biased coin flip each tick.
//! The odds are configuration, loaded from the `odds` section of the
//! YAML file, so a test can set them to `0.0` to suppress a transition
//! or `1.0` to force it.

use rand::Rng;
use serde::Deserialize;

use crate::error::MachineError;

/// Flip a coin that lands true with probability `p`.
///
/// Values outside `[0, 1]` saturate instead of panicking; construction
/// already rejects them through [`validate_probability`].
pub fn chance<R: Rng + ?Sized>(rng: &mut R, p: f64) -> bool {
    rng.random::<f64>() < p
}

/// Reject probabilities that are not finite or lie outside `[0, 1]`.
///
/// # Errors
///
/// Returns [`MachineError::InvalidProbability`] naming the field.
pub fn validate_probability(name: &'static str, value: f64) -> Result<(), MachineError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(MachineError::InvalidProbability { name, value })
    }
}

/// Odds for the CNC fault model.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct CncOdds {
    /// Chance per idle tick that a new program starts.
    #[serde(default = "default_cnc_cycle_start")]
    pub cycle_start: f64,
    /// Chance per tick of `SPINDLE_OVERLOAD` while load is above threshold.
    #[serde(default = "default_cnc_fault")]
    pub spindle_overload: f64,
    /// Chance per tick of `SPINDLE_THERMAL` while temperature is above threshold.
    #[serde(default = "default_cnc_fault")]
    pub spindle_thermal: f64,
    /// Chance per tick of `LOW_COOLANT` while coolant is below threshold.
    #[serde(default = "default_cnc_fault")]
    pub low_coolant: f64,
    /// Chance per alarmed tick that the alarm clears.
    #[serde(default = "default_cnc_recovery")]
    pub recovery: f64,
}

impl CncOdds {
    /// Odds with every fault and recovery disabled, keeping cycle starts.
    pub const fn quiet(cycle_start: f64) -> Self {
        Self {
            cycle_start,
            spindle_overload: 0.0,
            spindle_thermal: 0.0,
            low_coolant: 0.0,
            recovery: 0.0,
        }
    }

    /// Check every field is a valid probability.
    ///
    /// # Errors
    ///
    /// Returns [`MachineError::InvalidProbability`] for the first bad field.
    pub fn validate(&self) -> Result<(), MachineError> {
        validate_probability("cnc.cycle_start", self.cycle_start)?;
        validate_probability("cnc.spindle_overload", self.spindle_overload)?;
        validate_probability("cnc.spindle_thermal", self.spindle_thermal)?;
        validate_probability("cnc.low_coolant", self.low_coolant)?;
        validate_probability("cnc.recovery", self.recovery)
    }
}

impl Default for CncOdds {
    fn default() -> Self {
        Self {
            cycle_start: default_cnc_cycle_start(),
            spindle_overload: default_cnc_fault(),
            spindle_thermal: default_cnc_fault(),
            low_coolant: default_cnc_fault(),
            recovery: default_cnc_recovery(),
        }
    }
}

/// Odds for the press brake fault model.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PressBrakeOdds {
    /// Chance per idle tick that a bend cycle starts.
    #[serde(default = "default_press_cycle_start")]
    pub cycle_start: f64,
    /// Chance per tick of `OIL_OVERHEAT` while oil is above threshold.
    #[serde(default = "default_press_fault")]
    pub oil_overheat: f64,
    /// Chance per alarmed tick that the alarm clears.
    #[serde(default = "default_press_recovery")]
    pub recovery: f64,
}

impl PressBrakeOdds {
    /// Odds with faults and recovery disabled, keeping cycle starts.
    pub const fn quiet(cycle_start: f64) -> Self {
        Self {
            cycle_start,
            oil_overheat: 0.0,
            recovery: 0.0,
        }
    }

    /// Check every field is a valid probability.
    ///
    /// # Errors
    ///
    /// Returns [`MachineError::InvalidProbability`] for the first bad field.
    pub fn validate(&self) -> Result<(), MachineError> {
        validate_probability("press_brake.cycle_start", self.cycle_start)?;
        validate_probability("press_brake.oil_overheat", self.oil_overheat)?;
        validate_probability("press_brake.recovery", self.recovery)
    }
}

impl Default for PressBrakeOdds {
    fn default() -> Self {
        Self {
            cycle_start: default_press_cycle_start(),
            oil_overheat: default_press_fault(),
            recovery: default_press_recovery(),
        }
    }
}

/// Odds for the laser fault model.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LaserOdds {
    /// Chance per idle tick that a cut cycle starts.
    #[serde(default = "default_laser_cycle_start")]
    pub cycle_start: f64,
    /// Chance per tick of `RESONATOR_OVERHEAT` while above threshold.
    #[serde(default = "default_laser_fault")]
    pub resonator_overheat: f64,
    /// Chance per alarmed tick that the alarm clears.
    #[serde(default = "default_laser_recovery")]
    pub recovery: f64,
}

impl LaserOdds {
    /// Odds with faults and recovery disabled, keeping cycle starts.
    pub const fn quiet(cycle_start: f64) -> Self {
        Self {
            cycle_start,
            resonator_overheat: 0.0,
            recovery: 0.0,
        }
    }

    /// Check every field is a valid probability.
    ///
    /// # Errors
    ///
    /// Returns [`MachineError::InvalidProbability`] for the first bad field.
    pub fn validate(&self) -> Result<(), MachineError> {
        validate_probability("laser.cycle_start", self.cycle_start)?;
        validate_probability("laser.resonator_overheat", self.resonator_overheat)?;
        validate_probability("laser.recovery", self.recovery)
    }
}

impl Default for LaserOdds {
    fn default() -> Self {
        Self {
            cycle_start: default_laser_cycle_start(),
            resonator_overheat: default_laser_fault(),
            recovery: default_laser_recovery(),
        }
    }
}

/// Odds for every variant, as found under the `odds` configuration key.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct FleetOdds {
    /// CNC odds.
    #[serde(default)]
    pub cnc: CncOdds,
    /// Press brake odds.
    #[serde(default)]
    pub press_brake: PressBrakeOdds,
    /// Laser odds.
    #[serde(default)]
    pub laser: LaserOdds,
}

impl FleetOdds {
    /// Check all three variants.
    ///
    /// # Errors
    ///
    /// Returns [`MachineError::InvalidProbability`] for the first bad field.
    pub fn validate(&self) -> Result<(), MachineError> {
        self.cnc.validate()?;
        self.press_brake.validate()?;
        self.laser.validate()
    }
}

const fn default_cnc_cycle_start() -> f64 {
    0.05
}

const fn default_cnc_fault() -> f64 {
    0.05
}

const fn default_cnc_recovery() -> f64 {
    0.02
}

const fn default_press_cycle_start() -> f64 {
    0.08
}

const fn default_press_fault() -> f64 {
    0.08
}

const fn default_press_recovery() -> f64 {
    0.03
}

const fn default_laser_cycle_start() -> f64 {
    0.07
}

const fn default_laser_fault() -> f64 {
    0.08
}

const fn default_laser_recovery() -> f64 {
    0.03
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn certain_and_impossible_odds() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..1000 {
            assert!(chance(&mut rng, 1.0));
            assert!(!chance(&mut rng, 0.0));
        }
    }

    #[test]
    fn defaults_validate() {
        assert!(FleetOdds::default().validate().is_ok());
    }

    #[test]
    fn out_of_range_probability_is_rejected() {
        let odds = CncOdds {
            recovery: 1.5,
            ..CncOdds::default()
        };
        let err = odds.validate().unwrap_err();
        assert!(err.to_string().contains("cnc.recovery"));

        let odds = LaserOdds {
            cycle_start: f64::NAN,
            ..LaserOdds::default()
        };
        assert!(odds.validate().is_err());
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let odds: FleetOdds = serde_yml::from_str("cnc:\n  cycle_start: 0.5\n").unwrap();
        assert!((odds.cnc.cycle_start - 0.5).abs() < f64::EPSILON);
        assert_eq!(odds.cnc.recovery.to_bits(), CncOdds::default().recovery.to_bits());
        assert_eq!(odds.laser, LaserOdds::default());
    }
}
