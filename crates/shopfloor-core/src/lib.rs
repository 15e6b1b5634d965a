//! Simulation clock, fleet registry, and tick driver for the Shopfloor
//! simulator.
//!
//! The engine is a library: it owns the machines and advances them in
//! fixed increments, and exposes a small read/write surface that
//! presentation adapters (HTTP, XML) sit on top of.
//!
//! # Modules
//!
//! - [`clock`] -- Tick counter and simulated time with a validated
//!   increment.
//! - [`config`] -- Configuration loading from `shopfloor-config.yaml`
//!   into strongly-typed structs.
//! - [`fleet`] -- [`Fleet`] registry with per-machine locks, snapshots,
//!   and fault injection.
//! - [`operator`] -- Pause, resume, and stop controls shared with the
//!   HTTP layer.
//! - [`runner`] -- The async tick loop with drift-corrected sleep.
//! - [`tick`] -- One tick over the whole fleet.
//!
//! [`Fleet`]: fleet::Fleet

pub mod clock;
pub mod config;
pub mod fleet;
pub mod operator;
pub mod runner;
pub mod tick;
