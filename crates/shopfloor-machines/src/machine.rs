//! [`Machine`]: identity plus one of the three cycle models.

use rand::Rng;
use shopfloor_types::{ExecutionStatus, MachineId, MachineKind};

use crate::alarm::AlarmCode;
use crate::cnc::CncMachine;
use crate::cycle::{CycleModel, Readout, TickOutcome};
use crate::laser::LaserMachine;
use crate::press_brake::PressBrakeMachine;

/// The closed set of machine variants.
#[derive(Debug, Clone, PartialEq)]
pub enum Variant {
    /// CNC mill or lathe.
    Cnc(CncMachine),
    /// Hydraulic press brake.
    PressBrake(PressBrakeMachine),
    /// Fiber laser cutter.
    Laser(LaserMachine),
}

/// A named machine on the floor.
#[derive(Debug, Clone, PartialEq)]
pub struct Machine {
    id: MachineId,
    name: String,
    variant: Variant,
}

impl Machine {
    /// Wrap a cycle model with its identity.
    pub fn new(id: impl Into<MachineId>, name: impl Into<String>, variant: Variant) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            variant,
        }
    }

    /// Stable key.
    pub const fn id(&self) -> &MachineId {
        &self.id
    }

    /// Display label.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The variant and its private state.
    pub const fn variant(&self) -> &Variant {
        &self.variant
    }

    /// Which kind of machine this is.
    pub const fn kind(&self) -> MachineKind {
        match &self.variant {
            Variant::Cnc(_) => CncMachine::KIND,
            Variant::PressBrake(_) => PressBrakeMachine::KIND,
            Variant::Laser(_) => LaserMachine::KIND,
        }
    }

    /// Advance by `dt` simulated seconds.
    pub fn tick<R: Rng + ?Sized>(&mut self, dt: f64, rng: &mut R) -> TickOutcome {
        match &mut self.variant {
            Variant::Cnc(m) => m.tick(dt, rng),
            Variant::PressBrake(m) => m.tick(dt, rng),
            Variant::Laser(m) => m.tick(dt, rng),
        }
    }

    /// Force `code` onto the machine, abandoning any cycle in progress.
    pub fn inject_fault(&mut self, code: AlarmCode) {
        match &mut self.variant {
            Variant::Cnc(m) => m.inject_fault(code),
            Variant::PressBrake(m) => m.inject_fault(code),
            Variant::Laser(m) => m.inject_fault(code),
        }
    }

    /// Coarse status.
    pub fn execution(&self) -> ExecutionStatus {
        match &self.variant {
            Variant::Cnc(m) => m.execution(),
            Variant::PressBrake(m) => m.execution(),
            Variant::Laser(m) => m.execution(),
        }
    }

    /// Active alarm.
    pub fn alarm(&self) -> Option<&AlarmCode> {
        match &self.variant {
            Variant::Cnc(m) => m.alarm(),
            Variant::PressBrake(m) => m.alarm(),
            Variant::Laser(m) => m.alarm(),
        }
    }

    /// Unrounded dashboard view.
    pub fn readout(&self) -> Readout {
        match &self.variant {
            Variant::Cnc(m) => m.readout(),
            Variant::PressBrake(m) => m.readout(),
            Variant::Laser(m) => m.readout(),
        }
    }
}
