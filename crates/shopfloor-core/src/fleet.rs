//! Fleet registry: the set of machines, their read surface, and fault
//! injection.
//!
//! Every machine sits behind its own [`Mutex`], so a tick on one machine
//! never waits on a reader of another. Readers hold a lock only long
//! enough to clone the machine's state; the rounded record is built after
//! the lock is released. Fault injection takes the same per-machine lock
//! as the tick, so an alarm is never observed half-applied.
//!
//! A poisoned lock is recovered rather than propagated: the machine state
//! is plain data and stays consistent between field updates that matter.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use shopfloor_machines::{AlarmCode, FleetOdds, Machine, MachineError};
use shopfloor_types::{AlarmRecord, MachineId, MachineRecord};
use tracing::info;

use crate::config::MachineConfig;

/// Errors from the fleet read/write surface and construction.
#[derive(Debug, thiserror::Error)]
pub enum FleetError {
    /// No machine has the requested id.
    #[error("machine not found: {id}")]
    NotFound {
        /// The id that was looked up.
        id: String,
    },

    /// Two configured machines share an id.
    #[error("duplicate machine id: {id}")]
    DuplicateId {
        /// The repeated id.
        id: String,
    },

    /// A configured machine could not be constructed.
    #[error("invalid machine {id}: {source}")]
    Machine {
        /// The offending machine.
        id: String,
        /// Why construction failed.
        source: MachineError,
    },
}

/// The machines on the floor, in configuration order.
#[derive(Debug)]
pub struct Fleet {
    machines: Vec<Mutex<Machine>>,
    index: HashMap<MachineId, usize>,
}

impl Fleet {
    /// Build every configured machine.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::Machine`] for invalid limits or odds and
    /// [`FleetError::DuplicateId`] if an id repeats.
    pub fn from_config(entries: &[MachineConfig], odds: &FleetOdds) -> Result<Self, FleetError> {
        let machines = entries
            .iter()
            .map(|entry| {
                entry.build(odds).map_err(|source| FleetError::Machine {
                    id: entry.id().to_owned(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_machines(machines)
    }

    /// Register already constructed machines, keeping their order.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::DuplicateId`] if an id repeats.
    pub fn from_machines(machines: Vec<Machine>) -> Result<Self, FleetError> {
        let mut index = HashMap::with_capacity(machines.len());
        for (position, machine) in machines.iter().enumerate() {
            if index.insert(machine.id().clone(), position).is_some() {
                return Err(FleetError::DuplicateId {
                    id: machine.id().to_string(),
                });
            }
        }
        info!(machines = machines.len(), "Fleet registered");
        Ok(Self {
            machines: machines.into_iter().map(Mutex::new).collect(),
            index,
        })
    }

    /// Number of machines.
    pub fn len(&self) -> usize {
        self.machines.len()
    }

    /// Whether the fleet has no machines.
    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }

    /// Whether a machine with `id` exists.
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Rounded record of one machine.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::NotFound`] for an unknown id.
    pub fn snapshot(&self, id: &str) -> Result<MachineRecord, FleetError> {
        let machine = lock(self.slot(id)?).clone();
        Ok(machine.record(Utc::now()))
    }

    /// Rounded records of every machine, in configuration order.
    pub fn snapshot_all(&self) -> Vec<MachineRecord> {
        let now = Utc::now();
        self.machines
            .iter()
            .map(|slot| {
                let machine = lock(slot).clone();
                machine.record(now)
            })
            .collect()
    }

    /// Every machine currently stopped on an alarm.
    pub fn active_alarms(&self) -> Vec<AlarmRecord> {
        self.snapshot_all()
            .iter()
            .filter_map(AlarmRecord::from_record)
            .collect()
    }

    /// Force `code` onto machine `id`, overriding any cycle in progress.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::NotFound`] for an unknown id.
    pub fn inject_fault(&self, id: &str, code: &str) -> Result<(), FleetError> {
        let slot = self.slot(id)?;
        lock(slot).inject_fault(AlarmCode::parse(code));
        info!(machine = id, alarm = code, "Fault injected");
        Ok(())
    }

    /// Run `f` on every machine in order, holding only that machine's lock.
    pub fn for_each_mut<F>(&self, mut f: F)
    where
        F: FnMut(&mut Machine),
    {
        for slot in &self.machines {
            let mut machine = lock(slot);
            f(&mut *machine);
        }
    }

    fn slot(&self, id: &str) -> Result<&Mutex<Machine>, FleetError> {
        self.index
            .get(id)
            .and_then(|&position| self.machines.get(position))
            .ok_or_else(|| FleetError::NotFound { id: id.to_owned() })
    }
}

fn lock(slot: &Mutex<Machine>) -> MutexGuard<'_, Machine> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}
