//! Simulation clock.
//!
//! The clock counts ticks and converts them into simulated seconds. The
//! increment is fixed for the lifetime of a run and must lie within
//! [`MIN_TICK_SECONDS`]..=[`MAX_TICK_SECONDS`]; machine ramps and decays
//! scale with it, so larger steps only coarsen the physics.

/// Smallest supported increment in simulated seconds.
pub const MIN_TICK_SECONDS: f64 = 0.1;

/// Largest supported increment in simulated seconds.
pub const MAX_TICK_SECONDS: f64 = 1.0;

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// Tick counter would overflow.
    #[error("tick counter overflow: cannot advance beyond u64::MAX")]
    TickOverflow,

    /// Invalid clock configuration (e.g. increment out of range).
    #[error("invalid clock configuration: {reason}")]
    InvalidConfig {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

/// Tick counter plus elapsed simulated time.
#[derive(Debug, Clone, PartialEq)]
pub struct SimClock {
    /// Ticks completed so far (incremented at the start of each tick).
    tick: u64,

    /// Simulated seconds per tick.
    tick_seconds: f64,

    /// Simulated seconds elapsed since start.
    sim_seconds: f64,
}

impl SimClock {
    /// Create a clock at tick 0.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidConfig`] if `tick_seconds` is not a
    /// finite value in the supported range.
    pub fn new(tick_seconds: f64) -> Result<Self, ClockError> {
        if !tick_seconds.is_finite() || !(MIN_TICK_SECONDS..=MAX_TICK_SECONDS).contains(&tick_seconds)
        {
            return Err(ClockError::InvalidConfig {
                reason: format!(
                    "tick_seconds must be within {MIN_TICK_SECONDS}..={MAX_TICK_SECONDS}, got {tick_seconds}"
                ),
            });
        }
        Ok(Self {
            tick: 0,
            tick_seconds,
            sim_seconds: 0.0,
        })
    }

    /// Advance the clock by one tick. Returns the new tick number.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::TickOverflow`] if the tick counter would exceed
    /// `u64::MAX`.
    pub fn advance(&mut self) -> Result<u64, ClockError> {
        self.tick = self.tick.checked_add(1).ok_or(ClockError::TickOverflow)?;
        self.sim_seconds += self.tick_seconds;
        Ok(self.tick)
    }

    /// Return the current tick number.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Return the fixed increment in simulated seconds.
    pub const fn tick_seconds(&self) -> f64 {
        self.tick_seconds
    }

    /// Return simulated seconds elapsed since start.
    pub const fn sim_seconds(&self) -> f64 {
        self.sim_seconds
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        let clock = SimClock::new(0.2).unwrap();
        assert_eq!(clock.tick(), 0);
        assert!(clock.sim_seconds().abs() < f64::EPSILON);
    }

    #[test]
    fn advance_accumulates_time() {
        let mut clock = SimClock::new(0.5).unwrap();
        assert_eq!(clock.advance().unwrap(), 1);
        assert_eq!(clock.advance().unwrap(), 2);
        assert!((clock.sim_seconds() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn accepts_range_bounds() {
        assert!(SimClock::new(0.1).is_ok());
        assert!(SimClock::new(1.0).is_ok());
    }

    #[test]
    fn rejects_out_of_range_increment() {
        assert!(SimClock::new(0.05).is_err());
        assert!(SimClock::new(1.5).is_err());
        assert!(SimClock::new(f64::NAN).is_err());
        let err = SimClock::new(0.0).unwrap_err();
        assert!(err.to_string().contains("tick_seconds"));
    }
}
