//! Alarm code vocabulary.
//!
//! Each variant raises its own fixed set of codes from the probabilistic
//! fault model. Externally injected faults may carry any code; those are
//! kept verbatim in [`AlarmCode::Custom`].

/// A named fault condition that suspends cycle progress until cleared.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AlarmCode {
    /// CNC spindle load above the overload threshold.
    SpindleOverload,
    /// CNC spindle temperature above the thermal threshold.
    SpindleThermal,
    /// CNC coolant tank below the low-level threshold.
    LowCoolant,
    /// Press brake hydraulic oil above the overheat threshold.
    OilOverheat,
    /// Laser resonator above the overheat threshold.
    ResonatorOverheat,
    /// Any other code, typically injected from outside for testing.
    Custom(String),
}

impl AlarmCode {
    /// Parse a wire code, mapping known names onto their variants.
    pub fn parse(code: &str) -> Self {
        match code {
            "SPINDLE_OVERLOAD" => Self::SpindleOverload,
            "SPINDLE_THERMAL" => Self::SpindleThermal,
            "LOW_COOLANT" => Self::LowCoolant,
            "OIL_OVERHEAT" => Self::OilOverheat,
            "RESONATOR_OVERHEAT" => Self::ResonatorOverheat,
            other => Self::Custom(other.to_owned()),
        }
    }

    /// Wire name of the code.
    pub fn as_str(&self) -> &str {
        match self {
            Self::SpindleOverload => "SPINDLE_OVERLOAD",
            Self::SpindleThermal => "SPINDLE_THERMAL",
            Self::LowCoolant => "LOW_COOLANT",
            Self::OilOverheat => "OIL_OVERHEAT",
            Self::ResonatorOverheat => "RESONATOR_OVERHEAT",
            Self::Custom(code) => code,
        }
    }
}

impl core::fmt::Display for AlarmCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for AlarmCode {
    fn from(code: &str) -> Self {
        Self::parse(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_round_trip_through_wire_names() {
        for code in [
            AlarmCode::SpindleOverload,
            AlarmCode::SpindleThermal,
            AlarmCode::LowCoolant,
            AlarmCode::OilOverheat,
            AlarmCode::ResonatorOverheat,
        ] {
            assert_eq!(AlarmCode::parse(code.as_str()), code);
        }
    }

    #[test]
    fn unknown_codes_are_kept_verbatim() {
        let code = AlarmCode::parse("TEST_ALARM");
        assert_eq!(code, AlarmCode::Custom(String::from("TEST_ALARM")));
        assert_eq!(code.to_string(), "TEST_ALARM");
    }
}
