//! IR heater retrofit bridge firmware library.
//!
//! Turns a remote-controlled heater into a scheduled, thermostat-driven
//! one: commands from a hub, a scheduler or a hysteresis thermostat are
//! delivered over IR with acknowledgment and bounded retry. All
//! ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! inside each module, so everything here builds and tests on the host.

#![deny(unused_must_use)]

pub mod app;
pub mod clock;
pub mod config;
pub mod control;
pub mod error;
pub mod ir;
pub mod pins;
pub mod scheduler;

pub mod adapters;
pub mod drivers;
pub mod sensors;
