//! Machine identifier.
//!
//! Machines are keyed by a short, human-chosen string (`haas_vf2`,
//! `durma_press`) that is fixed in configuration and never changes for
//! the lifetime of the process. The newtype keeps those keys from being
//! mixed up with display names or alarm codes.

use std::borrow::Borrow;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Stable string key of a machine in the fleet.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MachineId(String);

impl MachineId {
    /// Create an identifier from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the identifier and return the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl core::fmt::Display for MachineId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MachineId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for MachineId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for MachineId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn serializes_as_plain_string() {
        let id = MachineId::from("haas_vf2");
        let json = serde_json::to_string(&id).ok();
        assert_eq!(json.as_deref(), Some("\"haas_vf2\""));
    }

    #[test]
    fn map_lookup_by_str() {
        let mut map = BTreeMap::new();
        map.insert(MachineId::from("fiber_laser"), 5_usize);
        assert_eq!(map.get("fiber_laser"), Some(&5));
        assert_eq!(map.get("unknown"), None);
    }
}
