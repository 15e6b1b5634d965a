//! Shared type definitions for the Shopfloor machine simulator.
//!
//! This crate is the single source of truth for every type that crosses
//! the engine boundary. Types defined here flow downstream to `TypeScript`
//! via `ts-rs` for dashboards that consume the observer API.
//!
//! # Modules
//!
//! - [`ids`] -- The [`MachineId`] string key
//! - [`enums`] -- Coarse execution status and machine kind
//! - [`records`] -- Exported machine, alarm, tick, and stream records

pub mod enums;
pub mod ids;
pub mod records;

// Re-export all public types at crate root for convenience.
pub use enums::{ExecutionStatus, MachineKind};
pub use ids::MachineId;
pub use records::{
    AlarmRecord, AxisPositions, MachineRecord, StreamFrame, TickBroadcast, VariantTelemetry,
};

#[cfg(test)]
mod tests {
    //! Integration tests for type exports and `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        use ts_rs::TS;

        let _ = crate::ids::MachineId::export_all();
        let _ = crate::enums::ExecutionStatus::export_all();
        let _ = crate::enums::MachineKind::export_all();
        let _ = crate::records::MachineRecord::export_all();
        let _ = crate::records::AlarmRecord::export_all();
        let _ = crate::records::TickBroadcast::export_all();
        let _ = crate::records::StreamFrame::export_all();
    }
}
