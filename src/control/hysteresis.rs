//! Bang-bang heat demand with a hysteresis band.
//!
//! ```text
//!   heater off: start heating at  room <= target - band
//!   heater on:  keep heating while room <  target + band
//! ```

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatDemand {
    band_c: f32,
}

impl HeatDemand {
    /// A negative band is treated as zero.
    pub fn new(band_c: f32) -> Self {
        Self { band_c: band_c.max(0.0) }
    }

    pub fn band_c(&self) -> f32 {
        self.band_c
    }

    /// Whether the heater should be on, given its current commanded state.
    pub fn should_heat(&self, power_enabled: bool, heater_on: bool, target_c: f32, room_c: f32) -> bool {
        if !power_enabled {
            return false;
        }
        if heater_on {
            room_c < target_c + self.band_c
        } else {
            room_c <= target_c - self.band_c
        }
    }
}
