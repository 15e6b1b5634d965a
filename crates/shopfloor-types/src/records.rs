//! Read-only records exported by the simulation engine.
//!
//! A [`MachineRecord`] is a point-in-time copy of one machine's state,
//! captured under that machine's lock and never mutated afterwards.
//! Numeric fields arrive already rounded: downstream renderers print
//! them verbatim, so the number of decimal places is part of the
//! contract rather than a display concern.
//!
//! Every variant fills the same dashboard-facing fields. A press brake
//! reports tonnage percentage as `spindle_load` and oil temperature as
//! `temp_spindle`; a laser reports power percentage and resonator
//! temperature the same way. The raw variant values are carried in
//! [`VariantTelemetry`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{ExecutionStatus, MachineKind};
use crate::ids::MachineId;

// ---------------------------------------------------------------------------
// Machine record
// ---------------------------------------------------------------------------

/// Linear axis positions in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AxisPositions {
    /// X axis position.
    #[serde(rename = "X")]
    pub x: f64,
    /// Y axis position.
    #[serde(rename = "Y")]
    pub y: f64,
    /// Z axis position (ram position for a press brake).
    #[serde(rename = "Z")]
    pub z: f64,
}

/// Values that only exist on one machine variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum VariantTelemetry {
    /// CNC mill or lathe.
    Cnc {
        /// Rated spindle power in horsepower.
        spindle_power_hp: f64,
        /// Spindle speed commanded for the current cycle (rpm).
        target_spindle_speed: f64,
        /// Feed commanded for the current cycle (mm/min).
        target_feed: f64,
    },
    /// Hydraulic press brake.
    PressBrake {
        /// Current bending force in tonnes.
        tonnage: f64,
        /// Force targeted by the current bend in tonnes.
        target_tonnage: f64,
        /// Rated machine capacity in tonnes.
        max_tonnage: f64,
        /// Ram stroke position, 0 = top, 100 = full stroke.
        ram_position: f64,
        /// Hydraulic oil temperature in degrees Celsius.
        oil_temp: f64,
        /// Completed bend cycles.
        cycle_count: u64,
    },
    /// Fiber laser cutter.
    Laser {
        /// Current beam power in kilowatts.
        power_kw: f64,
        /// Power targeted by the current cut in kilowatts.
        target_power_kw: f64,
        /// Rated source power in kilowatts.
        max_power_kw: f64,
        /// Cutting feed in mm/min.
        cut_feed: f64,
        /// Resonator temperature in degrees Celsius.
        temp_resonator: f64,
        /// Assist gas pressure in bar.
        gas_pressure: f64,
    },
}

/// Point-in-time state of a single machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MachineRecord {
    /// Stable machine key.
    pub id: MachineId,
    /// Display label.
    pub name: String,
    /// Machine variant.
    #[serde(rename = "type")]
    pub kind: MachineKind,
    /// Coarse status.
    pub execution: ExecutionStatus,
    /// Variant-specific cycle phase name (e.g. `CUTTING`, `BEND`, `PIERCE`).
    pub cycle_phase: String,
    /// Seconds since the current phase was entered (2 decimals).
    pub time_in_phase: f64,
    /// Spindle speed in rpm (integer). Always 0 for non-spindle machines.
    pub spindle_speed: f64,
    /// Spindle load, tonnage or power as a percentage (2 decimals).
    pub spindle_load: f64,
    /// Feed in mm/min, or strokes/min for a press brake (integer).
    pub feed_rate: f64,
    /// Axis positions (3 decimals).
    pub axis_positions: AxisPositions,
    /// Spindle, oil, or resonator temperature (2 decimals).
    pub temp_spindle: f64,
    /// Vibration level (3 decimals).
    pub vibration: f64,
    /// Estimated motor current in amps (2 decimals).
    pub current_amps: f64,
    /// Accumulated tool wear in `[0, 1]` (4 decimals).
    pub tool_wear: f64,
    /// Coolant level percentage (1 decimal).
    pub coolant_level: f64,
    /// Completed parts.
    pub part_count: u64,
    /// Completed cycles.
    pub total_cycles: u64,
    /// Hours powered on (4 decimals).
    pub machine_on_hours: f64,
    /// Spindle, hydraulic, or beam hours (4 decimals).
    pub spindle_hours: f64,
    /// Active alarm code, if any.
    pub alarm: Option<String>,
    /// Raw variant-specific values.
    pub telemetry: VariantTelemetry,
    /// Wall-clock capture time.
    pub timestamp: DateTime<Utc>,
}

impl MachineRecord {
    /// Whether the record carries an active alarm.
    pub const fn has_alarm(&self) -> bool {
        self.alarm.is_some()
    }
}

// ---------------------------------------------------------------------------
// Alarm record
// ---------------------------------------------------------------------------

/// One active alarm in the plant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AlarmRecord {
    /// Machine raising the alarm.
    pub id: MachineId,
    /// Display label of the machine.
    pub name: String,
    /// Alarm code.
    pub alarm: String,
    /// Execution status at capture time (always `ALARM`).
    pub execution: ExecutionStatus,
    /// Wall-clock capture time.
    pub timestamp: DateTime<Utc>,
}

impl AlarmRecord {
    /// Project a machine record onto its alarm, if it has one.
    pub fn from_record(record: &MachineRecord) -> Option<Self> {
        record.alarm.as_ref().map(|alarm| Self {
            id: record.id.clone(),
            name: record.name.clone(),
            alarm: alarm.clone(),
            execution: record.execution,
            timestamp: record.timestamp,
        })
    }
}

// ---------------------------------------------------------------------------
// Tick broadcast
// ---------------------------------------------------------------------------

/// JSON-serializable tick summary pushed over the `WebSocket`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TickBroadcast {
    /// The tick number.
    pub tick: u64,
    /// Simulated seconds since start.
    pub sim_seconds: f64,
    /// Machines inside a cycle.
    pub running: u32,
    /// Machines waiting for a program.
    pub idle: u32,
    /// Machines stopped on an alarm.
    pub alarmed: u32,
    /// Parts completed during this tick.
    pub parts_finished: u32,
    /// Alarms raised during this tick as `(machine, code)` pairs.
    pub alarms_raised: Vec<(MachineId, String)>,
    /// Alarms cleared during this tick as `(machine, code)` pairs.
    #[serde(default)]
    pub alarms_cleared: Vec<(MachineId, String)>,
}

impl TickBroadcast {
    /// Whether any machine entered or left an alarm during this tick.
    pub fn has_alarm_transitions(&self) -> bool {
        !self.alarms_raised.is_empty() || !self.alarms_cleared.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Stream frames
// ---------------------------------------------------------------------------

/// One message on the `/ws/ticks` stream.
///
/// A client first receives a `fleet` frame with every machine record, then
/// one `tick` frame per tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum StreamFrame {
    /// Full fleet state at connect time.
    Fleet {
        /// Machine records in configuration order.
        machines: Vec<MachineRecord>,
    },
    /// Summary of one completed tick.
    Tick(TickBroadcast),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_record(alarm: Option<&str>) -> MachineRecord {
        MachineRecord {
            id: MachineId::from("haas_vf2"),
            name: String::from("Haas VF-2"),
            kind: MachineKind::Cnc,
            execution: if alarm.is_some() {
                ExecutionStatus::Alarm
            } else {
                ExecutionStatus::Idle
            },
            cycle_phase: String::from("IDLE"),
            time_in_phase: 0.0,
            spindle_speed: 0.0,
            spindle_load: 0.0,
            feed_rate: 0.0,
            axis_positions: AxisPositions::default(),
            temp_spindle: 25.0,
            vibration: 0.0,
            current_amps: 7.0,
            tool_wear: 0.0,
            coolant_level: 100.0,
            part_count: 0,
            total_cycles: 0,
            machine_on_hours: 0.0,
            spindle_hours: 0.0,
            alarm: alarm.map(str::to_owned),
            telemetry: VariantTelemetry::Cnc {
                spindle_power_hp: 30.0,
                target_spindle_speed: 0.0,
                target_feed: 0.0,
            },
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn record_uses_dashboard_field_names() {
        let json = serde_json::to_value(sample_record(None)).unwrap();
        assert_eq!(json["type"], "CNC");
        assert_eq!(json["execution"], "IDLE");
        assert!(json["axis_positions"]["X"].is_number());
        assert!(json["alarm"].is_null());
        assert!(json["telemetry"]["cnc"].is_object());
    }

    #[test]
    fn stream_frames_are_tagged() {
        let fleet = serde_json::to_value(StreamFrame::Fleet {
            machines: vec![sample_record(None)],
        })
        .unwrap();
        assert_eq!(fleet["type"], "fleet");
        assert_eq!(fleet["machines"][0]["id"], "haas_vf2");

        let tick = serde_json::to_value(StreamFrame::Tick(TickBroadcast {
            tick: 9,
            sim_seconds: 1.8,
            running: 1,
            idle: 0,
            alarmed: 0,
            parts_finished: 0,
            alarms_raised: Vec::new(),
            alarms_cleared: vec![(MachineId::from("haas_vf2"), String::from("LOW_COOLANT"))],
        }))
        .unwrap();
        assert_eq!(tick["type"], "tick");
        assert_eq!(tick["tick"], 9);
        assert_eq!(tick["alarms_cleared"][0][1], "LOW_COOLANT");
    }

    #[test]
    fn alarm_record_only_for_alarmed_machines() {
        assert!(AlarmRecord::from_record(&sample_record(None)).is_none());
        let alarm = AlarmRecord::from_record(&sample_record(Some("LOW_COOLANT"))).unwrap();
        assert_eq!(alarm.alarm, "LOW_COOLANT");
        assert_eq!(alarm.execution, ExecutionStatus::Alarm);
    }
}
