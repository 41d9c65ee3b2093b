//! btserver firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod fsm;
pub mod gatt;
pub mod oscillator;
pub mod producer;
pub mod shared;

// Hardware-facing modules; simulation stubs on host targets.
pub mod adapters;
pub mod drivers;
