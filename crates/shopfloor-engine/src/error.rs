//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure mode during startup and the run
//! so `main` can propagate with `?`.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: shopfloor_core::config::ConfigError,
    },

    /// The simulation clock rejected the configured increment.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: shopfloor_core::clock::ClockError,
    },

    /// The configured fleet could not be built.
    #[error("fleet error: {source}")]
    Fleet {
        /// The underlying fleet error.
        #[from]
        source: shopfloor_core::fleet::FleetError,
    },

    /// Observer API server failed to start.
    #[error("observer error: {source}")]
    Observer {
        /// The underlying startup error.
        #[from]
        source: shopfloor_observer::StartupError,
    },

    /// Simulation runner failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: shopfloor_core::runner::RunnerError,
    },
}
