//! Enumeration types shared between the engine and its consumers.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Coarse machine status exposed to external readers.
///
/// Derived from the cycle phase and the alarm slot: a machine with an
/// active alarm is always [`ExecutionStatus::Alarm`], an alarm-free machine
/// in its idle phase is [`ExecutionStatus::Idle`], anything else is
/// [`ExecutionStatus::Running`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum ExecutionStatus {
    /// Waiting for the next program to start.
    Idle,
    /// Somewhere inside a working cycle.
    Running,
    /// Stopped on a fault until the alarm clears.
    Alarm,
}

impl ExecutionStatus {
    /// Wire name of the status (`IDLE`, `RUNNING`, `ALARM`).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Running => "RUNNING",
            Self::Alarm => "ALARM",
        }
    }
}

impl core::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The closed set of simulated machine variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum MachineKind {
    /// CNC mill or lathe.
    Cnc,
    /// Hydraulic press brake.
    PressBrake,
    /// Fiber laser cutter.
    Laser,
}

impl MachineKind {
    /// Wire name of the kind (`CNC`, `PRESS_BRAKE`, `LASER`).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cnc => "CNC",
            Self::PressBrake => "PRESS_BRAKE",
            Self::Laser => "LASER",
        }
    }
}

impl core::fmt::Display for MachineKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
