//! Error types for the `shopfloor-machines` crate.
//!
//! Machines cannot fail while ticking: every quantity is clamped back
//! into range. The only failures are at construction time, when the
//! configured limits or probabilities make no physical sense.

/// Errors raised while constructing a machine.
#[derive(Debug, thiserror::Error)]
pub enum MachineError {
    /// The physical limits of a machine are inconsistent.
    #[error("invalid limits: {reason}")]
    InvalidLimits {
        /// Explanation of what is wrong with the limits.
        reason: String,
    },

    /// A per-tick probability is outside `[0, 1]` or not finite.
    #[error("probability {name} must be within [0, 1], got {value}")]
    InvalidProbability {
        /// Name of the offending odds field.
        name: &'static str,
        /// The configured value.
        value: f64,
    },
}
