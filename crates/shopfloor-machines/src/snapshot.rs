//! Export of a machine into a display-ready [`MachineRecord`].
//!
//! Rounding is part of the exported contract: dashboards print these
//! values verbatim. Decimal places per field:
//!
//! | Field | Places |
//! |-------|--------|
//! | `spindle_speed`, `feed_rate` | 0 |
//! | `spindle_load`, `temp_spindle`, `current_amps`, `time_in_phase` | 2 |
//! | `axis_positions`, `vibration` | 3 |
//! | `tool_wear`, `machine_on_hours`, `spindle_hours` | 4 |
//! | `coolant_level` | 1 |

use chrono::{DateTime, Utc};
use shopfloor_types::{AxisPositions, MachineRecord, VariantTelemetry};

use crate::machine::Machine;

/// Round `value` to `places` decimal places, half away from zero.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10_f64.powi(places);
    (value * factor).round() / factor
}

fn round_axes(axes: AxisPositions) -> AxisPositions {
    AxisPositions {
        x: round_to(axes.x, 3),
        y: round_to(axes.y, 3),
        z: round_to(axes.z, 3),
    }
}

fn round_telemetry(telemetry: VariantTelemetry) -> VariantTelemetry {
    match telemetry {
        VariantTelemetry::Cnc {
            spindle_power_hp,
            target_spindle_speed,
            target_feed,
        } => VariantTelemetry::Cnc {
            spindle_power_hp: round_to(spindle_power_hp, 1),
            target_spindle_speed: target_spindle_speed.round(),
            target_feed: target_feed.round(),
        },
        VariantTelemetry::PressBrake {
            tonnage,
            target_tonnage,
            max_tonnage,
            ram_position,
            oil_temp,
            cycle_count,
        } => VariantTelemetry::PressBrake {
            tonnage: round_to(tonnage, 2),
            target_tonnage: round_to(target_tonnage, 2),
            max_tonnage: round_to(max_tonnage, 2),
            ram_position: round_to(ram_position, 2),
            oil_temp: round_to(oil_temp, 2),
            cycle_count,
        },
        VariantTelemetry::Laser {
            power_kw,
            target_power_kw,
            max_power_kw,
            cut_feed,
            temp_resonator,
            gas_pressure,
        } => VariantTelemetry::Laser {
            power_kw: round_to(power_kw, 3),
            target_power_kw: round_to(target_power_kw, 3),
            max_power_kw: round_to(max_power_kw, 3),
            cut_feed: cut_feed.round(),
            temp_resonator: round_to(temp_resonator, 2),
            gas_pressure: round_to(gas_pressure, 2),
        },
    }
}

impl Machine {
    /// Rounded record of the current state, stamped with `at`.
    pub fn record(&self, at: DateTime<Utc>) -> MachineRecord {
        let readout = self.readout();
        MachineRecord {
            id: self.id().clone(),
            name: self.name().to_owned(),
            kind: self.kind(),
            execution: readout.execution,
            cycle_phase: readout.phase.to_owned(),
            time_in_phase: round_to(readout.time_in_phase, 2),
            spindle_speed: readout.spindle_speed.round(),
            spindle_load: round_to(readout.spindle_load, 2),
            feed_rate: readout.feed_rate.round(),
            axis_positions: round_axes(readout.axes),
            temp_spindle: round_to(readout.temperature, 2),
            vibration: round_to(readout.vibration, 3),
            current_amps: round_to(readout.current_amps, 2),
            tool_wear: round_to(readout.tool_wear, 4),
            coolant_level: round_to(readout.coolant_level, 1),
            part_count: readout.counters.part_count,
            total_cycles: readout.counters.total_cycles,
            machine_on_hours: round_to(readout.counters.machine_on_hours, 4),
            spindle_hours: round_to(readout.counters.work_hours, 4),
            alarm: readout.alarm.map(|code| code.as_str().to_owned()),
            telemetry: round_telemetry(readout.telemetry),
            timestamp: at,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::cnc::{AxisRange, CncLimits, CncMachine};
    use crate::machine::Variant;
    use crate::odds::CncOdds;
    use crate::{AlarmCode, CycleModel};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use shopfloor_types::{ExecutionStatus, MachineKind};

    fn haas_vf2() -> Machine {
        let limits = CncLimits {
            spindle_power_hp: 30.0,
            x: AxisRange::new(0.0, 762.0),
            y: AxisRange::new(0.0, 406.0),
            z: AxisRange::new(0.0, 508.0),
        };
        let cnc = CncMachine::new(limits, CncOdds::quiet(0.2)).unwrap();
        Machine::new("haas_vf2", "Haas VF-2", Variant::Cnc(cnc))
    }

    fn decimals(value: f64, places: i32) -> bool {
        (round_to(value, places) - value).abs() < 1e-9
    }

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round_to(1.2345, 2), 1.23);
        assert_eq!(round_to(0.125, 2), 0.13);
        assert_eq!(round_to(-2.5, 0), -3.0);
        assert_eq!(round_to(7.0, 3), 7.0);
    }

    #[test]
    fn record_fields_carry_bounded_decimals() {
        let mut machine = haas_vf2();
        let mut rng = StdRng::seed_from_u64(99);
        let now = Utc::now();
        for _ in 0..500 {
            machine.tick(0.2, &mut rng);
            let record = machine.record(now);
            assert!(decimals(record.spindle_speed, 0));
            assert!(decimals(record.feed_rate, 0));
            assert!(decimals(record.spindle_load, 2));
            assert!(decimals(record.temp_spindle, 2));
            assert!(decimals(record.axis_positions.x, 3));
            assert!(decimals(record.vibration, 3));
            assert!(decimals(record.tool_wear, 4));
            assert!(decimals(record.coolant_level, 1));
            assert!(decimals(record.machine_on_hours, 4));
        }
    }

    #[test]
    fn identical_state_gives_identical_records() {
        let mut machine = haas_vf2();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..50 {
            machine.tick(0.2, &mut rng);
        }
        let at = Utc::now();
        assert_eq!(machine.record(at), machine.record(at));
    }

    #[test]
    fn record_reflects_injected_alarm() {
        let mut machine = haas_vf2();
        machine.inject_fault(AlarmCode::parse("TEST_ALARM"));
        let record = machine.record(Utc::now());
        assert_eq!(record.kind, MachineKind::Cnc);
        assert_eq!(record.execution, ExecutionStatus::Alarm);
        assert_eq!(record.alarm.as_deref(), Some("TEST_ALARM"));
        assert_eq!(record.cycle_phase, "IDLE");
    }

    #[test]
    fn record_serializes_with_wire_names() {
        let machine = haas_vf2();
        let json = serde_json::to_value(machine.record(Utc::now())).unwrap();
        assert_eq!(json["type"], "CNC");
        assert_eq!(json["execution"], "IDLE");
        assert_eq!(json["axis_positions"]["Z"], 508.0);
        assert!(json["alarm"].is_null());
    }

    #[test]
    fn cnc_variant_trait_kind_matches() {
        assert_eq!(CncMachine::KIND, MachineKind::Cnc);
    }
}
