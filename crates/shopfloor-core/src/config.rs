//! Configuration loading and typed config structures for the Shopfloor
//! simulator.
//!
//! The canonical configuration lives in `shopfloor-config.yaml` at the
//! project root. Every section and field has a default, so an empty file
//! (or no file at all) yields the stock six-machine plant.

use std::path::Path;

use serde::Deserialize;
use shopfloor_machines::{
    AxisRange, CncLimits, CncMachine, FleetOdds, LaserLimits, LaserMachine, Machine, MachineError,
    PressBrakeLimits, PressBrakeMachine, Variant,
};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is outside its allowed range.
    #[error("invalid config: {reason}")]
    Invalid {
        /// What was wrong.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `shopfloor-config.yaml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Plant-level settings (name, seed, timing).
    #[serde(default)]
    pub world: WorldConfig,

    /// Run boundaries.
    #[serde(default)]
    pub simulation: SimulationBoundsConfig,

    /// Observer listen address.
    #[serde(default)]
    pub infrastructure: InfrastructureConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Per-variant cycle start, fault, and recovery probabilities.
    #[serde(default)]
    pub odds: FleetOdds,

    /// The machines on the floor, in display order.
    #[serde(default = "default_machines")]
    pub machines: Vec<MachineConfig>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            world: WorldConfig::default(),
            simulation: SimulationBoundsConfig::default(),
            infrastructure: InfrastructureConfig::default(),
            logging: LoggingConfig::default(),
            odds: FleetOdds::default(),
            machines: default_machines(),
        }
    }
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values for the observer:
    /// - `OBSERVER_HOST` overrides `infrastructure.observer_host`
    /// - `OBSERVER_PORT` overrides `infrastructure.observer_port`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or any
    /// error [`parse`](Self::parse) reports.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if `world.tick_interval_ms` is zero.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes as unit, not as an empty map.
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        if config.world.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                reason: String::from("world.tick_interval_ms must be at least 1"),
            });
        }
        config.infrastructure.apply_env_overrides();
        Ok(config)
    }
}

/// Plant-level configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WorldConfig {
    /// Human-readable plant name.
    #[serde(default = "default_world_name")]
    pub name: String,
    /// Random seed for reproducible runs. Drawn from the OS when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Simulated seconds per tick.
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: f64,
    /// Real-time milliseconds per tick.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            name: default_world_name(),
            seed: None,
            tick_seconds: default_tick_seconds(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

/// Run boundaries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SimulationBoundsConfig {
    /// Stop after this many ticks (0 = run until stopped).
    #[serde(default)]
    pub max_ticks: u64,
}

/// Observer listen address.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InfrastructureConfig {
    /// Interface the observer binds to.
    #[serde(default = "default_observer_host")]
    pub observer_host: String,
    /// Observer HTTP port.
    #[serde(default = "default_observer_port")]
    pub observer_port: u16,
}

impl InfrastructureConfig {
    /// Override observer settings with environment variables when set.
    ///
    /// An `OBSERVER_PORT` that is not a valid port number is ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("OBSERVER_HOST") {
            self.observer_host = val;
        }
        if let Ok(val) = std::env::var("OBSERVER_PORT") {
            if let Ok(port) = val.parse() {
                self.observer_port = port;
            }
        }
    }
}

impl Default for InfrastructureConfig {
    fn default() -> Self {
        Self {
            observer_host: default_observer_host(),
            observer_port: default_observer_port(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default `tracing` filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// One machine entry, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MachineConfig {
    /// CNC mill or lathe.
    Cnc {
        /// Stable machine key.
        id: String,
        /// Display label.
        name: String,
        /// Spindle power and axis travel.
        limits: CncLimits,
    },
    /// Hydraulic press brake.
    PressBrake {
        /// Stable machine key.
        id: String,
        /// Display label.
        name: String,
        /// Rated capacity.
        #[serde(default)]
        limits: PressBrakeLimits,
    },
    /// Fiber laser cutter.
    Laser {
        /// Stable machine key.
        id: String,
        /// Display label.
        name: String,
        /// Rated source power.
        #[serde(default)]
        limits: LaserLimits,
    },
}

impl MachineConfig {
    /// The configured machine key.
    pub fn id(&self) -> &str {
        match self {
            Self::Cnc { id, .. } | Self::PressBrake { id, .. } | Self::Laser { id, .. } => id,
        }
    }

    /// The configured display label.
    pub fn name(&self) -> &str {
        match self {
            Self::Cnc { name, .. } | Self::PressBrake { name, .. } | Self::Laser { name, .. } => {
                name
            }
        }
    }

    /// Construct the machine this entry describes.
    ///
    /// # Errors
    ///
    /// Returns [`MachineError`] if the limits or odds are invalid.
    pub fn build(&self, odds: &FleetOdds) -> Result<Machine, MachineError> {
        let variant = match self {
            Self::Cnc { limits, .. } => Variant::Cnc(CncMachine::new(*limits, odds.cnc)?),
            Self::PressBrake { limits, .. } => {
                Variant::PressBrake(PressBrakeMachine::new(*limits, odds.press_brake)?)
            }
            Self::Laser { limits, .. } => Variant::Laser(LaserMachine::new(*limits, odds.laser)?),
        };
        Ok(Machine::new(self.id(), self.name(), variant))
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_world_name() -> String {
    "Shopfloor Plant".to_owned()
}

const fn default_tick_seconds() -> f64 {
    0.2
}

const fn default_tick_interval_ms() -> u64 {
    200
}

fn default_observer_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_observer_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn cnc(id: &str, name: &str, hp: f64, x: f64, y: f64, z: f64) -> MachineConfig {
    MachineConfig::Cnc {
        id: id.to_owned(),
        name: name.to_owned(),
        limits: CncLimits {
            spindle_power_hp: hp,
            x: AxisRange::new(0.0, x),
            y: AxisRange::new(0.0, y),
            z: AxisRange::new(0.0, z),
        },
    }
}

/// The stock plant: four CNCs, a press brake, and a fiber laser.
pub fn default_machines() -> Vec<MachineConfig> {
    vec![
        cnc("haas_vf2", "Haas VF-2", 30.0, 762.0, 406.0, 508.0),
        cnc("haas_vf4", "Haas VF-4", 30.0, 1270.0, 508.0, 635.0),
        cnc("toyoda_hmc", "Toyoda HMC", 40.0, 800.0, 700.0, 600.0),
        cnc("cnc_lathe", "CNC Lathe", 20.0, 300.0, 200.0, 500.0),
        MachineConfig::PressBrake {
            id: "durma_press".to_owned(),
            name: "Durma Press Brake".to_owned(),
            limits: PressBrakeLimits::default(),
        },
        MachineConfig::Laser {
            id: "fiber_laser".to_owned(),
            name: "Fiber Laser".to_owned(),
            limits: LaserLimits::default(),
        },
    ]
}
