//! Engine binary for the Shopfloor simulator.
//!
//! Wires together the configuration, the machine fleet, the tick loop,
//! and the Observer API, then runs until the tick limit is reached or an
//! operator stops the loop.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `shopfloor-config.yaml` (or the path in
//!    `SHOPFLOOR_CONFIG`, or the first argument)
//! 2. Initialize structured logging (tracing)
//! 3. Create the simulation clock
//! 4. Build the fleet from the configured machines
//! 5. Seed the random source
//! 6. Create operator state from simulation bounds
//! 7. Start the Observer API server
//! 8. Install the Ctrl-C handler
//! 9. Run the simulation loop
//! 10. Keep serving the final state until Ctrl-C

mod error;
mod observer_callback;

use std::path::PathBuf;
use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use shopfloor_core::clock::SimClock;
use shopfloor_core::config::SimulationConfig;
use shopfloor_core::fleet::Fleet;
use shopfloor_core::operator::OperatorState;
use shopfloor_core::runner;
use shopfloor_core::tick::SimulationState;
use shopfloor_observer::server::ServerConfig;
use shopfloor_observer::state::AppState;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::observer_callback::ObserverCallback;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "shopfloor-config.yaml";

/// Environment variable naming an alternative configuration file.
const CONFIG_PATH_ENV: &str = "SHOPFLOOR_CONFIG";

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if any initialization step or the simulation itself fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration (before logging, so its level applies).
    let (config, config_source) = load_config()?;

    // 2. Initialize structured logging. RUST_LOG wins over the config.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!("shopfloor-engine starting");
    info!(
        source = %config_source,
        plant = config.world.name,
        tick_seconds = config.world.tick_seconds,
        tick_interval_ms = config.world.tick_interval_ms,
        machines = config.machines.len(),
        "Configuration loaded"
    );

    // 3. Create the simulation clock.
    let clock = SimClock::new(config.world.tick_seconds).map_err(EngineError::from)?;

    // 4. Build the fleet. Invalid limits or duplicate ids abort startup.
    let fleet =
        Arc::new(Fleet::from_config(&config.machines, &config.odds).map_err(EngineError::from)?);
    info!(machine_count = fleet.len(), "Fleet assembled");

    // 5. Seed the random source.
    let seed = config.world.seed.unwrap_or_else(rand::random);
    info!(seed, from_config = config.world.seed.is_some(), "Random source seeded");
    let rng = StdRng::seed_from_u64(seed);

    // 6. Create operator state.
    let operator = Arc::new(OperatorState::new(
        config.world.tick_interval_ms,
        &config.simulation,
    ));
    info!(
        max_ticks = operator.max_ticks(),
        tick_interval_ms = operator.tick_interval_ms(),
        "Operator state initialized"
    );

    // 7. Start the Observer API server.
    let app_state = Arc::new(AppState::with_operator(
        Arc::clone(&fleet),
        Arc::clone(&operator),
    ));
    let server_config = ServerConfig {
        host: config.infrastructure.observer_host.clone(),
        port: config.infrastructure.observer_port,
    };
    let observer_handle = shopfloor_observer::spawn_observer(server_config, Arc::clone(&app_state))
        .map_err(EngineError::from)?;

    // 8. Ctrl-C requests a clean stop of the tick loop.
    let ctrl_c_operator = Arc::clone(&operator);
    let shutdown_handle = tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received, requesting stop");
                ctrl_c_operator.request_stop();
            }
            Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C"),
        }
    });

    // 9. Run the simulation.
    let mut sim_state = SimulationState::new(clock, fleet, rng);
    let mut callback = ObserverCallback::new(app_state);

    let result = runner::run_simulation(&mut sim_state, &operator, &mut callback)
        .await
        .map_err(EngineError::from)?;
    runner::log_simulation_end(&result);

    // 10. The observer keeps serving the final machine state until Ctrl-C.
    if !shutdown_handle.is_finished() {
        info!("Tick loop finished; observer still serving, press Ctrl-C to exit");
        if let Err(e) = shutdown_handle.await {
            warn!(error = %e, "Ctrl-C handler task failed");
        }
    }
    observer_handle.abort();

    info!(
        end_reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        "shopfloor-engine shutdown complete"
    );

    Ok(())
}

/// Load the simulation configuration.
///
/// The path comes from the first command-line argument, then
/// `SHOPFLOOR_CONFIG`, then `shopfloor-config.yaml`. A missing default
/// file falls back to the built-in plant; a missing explicit file is an
/// error.
fn load_config() -> Result<(SimulationConfig, String), EngineError> {
    let explicit = std::env::args()
        .nth(1)
        .or_else(|| std::env::var(CONFIG_PATH_ENV).ok())
        .map(PathBuf::from);

    if let Some(path) = explicit {
        let config = SimulationConfig::from_file(&path)?;
        return Ok((config, path.display().to_string()));
    }

    let path = PathBuf::from(DEFAULT_CONFIG_PATH);
    if path.exists() {
        let config = SimulationConfig::from_file(&path)?;
        Ok((config, path.display().to_string()))
    } else {
        Ok((SimulationConfig::parse("")?, String::from("built-in defaults")))
    }
}
