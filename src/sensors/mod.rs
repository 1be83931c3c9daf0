//! Sensor drivers.

pub mod room_temperature;
