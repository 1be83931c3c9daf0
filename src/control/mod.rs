//! Local thermostat logic used as a command source by the delivery loop.

pub mod hysteresis;
