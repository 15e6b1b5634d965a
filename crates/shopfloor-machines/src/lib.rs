//! Phase-based cycle machines for the Shopfloor simulator.
//!
//! Each machine variant runs its own finite-state machine over a working
//! cycle and drives its physical quantities forward in fixed time
//! increments. Fault onset, cycle starts, and alarm recovery are biased
//! coin flips drawn from a caller-supplied random source, so tests can
//! seed, force, or suppress them.
//!
//! # Modules
//!
//! - [`alarm`] -- [`AlarmCode`] vocabulary shared by all variants.
//! - [`cnc`] -- CNC mill/lathe: spindle ramp, rapid, cutting, retract.
//! - [`cycle`] -- Phase timer, cumulative counters, and the shared
//!   [`CycleModel`] contract.
//! - [`error`] -- Construction errors for limits and odds.
//! - [`laser`] -- Fiber laser: pierce, cut, travel.
//! - [`machine`] -- [`Machine`], the closed sum over the three variants.
//! - [`odds`] -- Per-tick probabilities for starts, faults, and recovery.
//! - [`press_brake`] -- Press brake: approach, bend, hold, return.
//! - [`snapshot`] -- Export of a machine into a rounded [`MachineRecord`].
//!
//! [`MachineRecord`]: shopfloor_types::MachineRecord

pub mod alarm;
pub mod cnc;
pub mod cycle;
pub mod error;
pub mod laser;
pub mod machine;
pub mod odds;
pub mod press_brake;
pub mod snapshot;

// Re-export primary types at crate root.
pub use alarm::AlarmCode;
pub use cnc::{AxisRange, CncLimits, CncMachine, CncPhase};
pub use cycle::{CycleModel, Readout, TickOutcome};
pub use error::MachineError;
pub use laser::{LaserLimits, LaserMachine, LaserPhase};
pub use machine::{Machine, Variant};
pub use odds::{CncOdds, FleetOdds, LaserOdds, PressBrakeOdds};
pub use press_brake::{PressBrakeLimits, PressBrakeMachine, PressBrakePhase};
