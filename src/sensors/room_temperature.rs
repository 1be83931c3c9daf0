//! Room temperature from an NTC thermistor (10 kΩ @ 25 °C, B = 3950).
//!
//! Wired in a voltage divider with a fixed 10 kΩ resistor and read via
//! ADC1. The Beta equation converts resistance to temperature.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: oneshot ADC read (channel set up by `hw_init`).
//! On host/test: reads a static `AtomicU16` for injection; 0 means
//! "no reading".

use core::sync::atomic::{AtomicU16, Ordering};

#[cfg(target_os = "espidf")]
use crate::drivers::hw_init;

static SIM_ROOM_ADC: AtomicU16 = AtomicU16::new(0);

/// Inject a raw ADC value for host runs.
pub fn sim_set_room_adc(raw: u16) {
    SIM_ROOM_ADC.store(raw, Ordering::Relaxed);
}

const R25: f32 = 10_000.0;
const BETA: f32 = 3950.0;
const T25_K: f32 = 298.15;
const R_DIVIDER: f32 = 10_000.0;
const ADC_MAX: f32 = 4095.0;
const V_REF: f32 = 3.3;

/// Exponential smoothing weight for new samples.
const SMOOTHING: f32 = 0.2;

pub struct RoomTemperatureSensor {
    channel: u32,
    filtered_c: Option<f32>,
}

impl RoomTemperatureSensor {
    pub fn new(channel: u32) -> Self {
        Self { channel, filtered_c: None }
    }

    pub fn channel(&self) -> u32 {
        self.channel
    }

    /// Smoothed temperature, `None` until the first plausible sample.
    /// Open or shorted thermistors are skipped, keeping the last value.
    pub fn read(&mut self) -> Option<f32> {
        if let Some(c) = self.read_raw().and_then(adc_to_celsius) {
            self.filtered_c = Some(match self.filtered_c {
                Some(prev) => prev + SMOOTHING * (c - prev),
                None => c,
            });
        }
        self.filtered_c
    }

    #[cfg(target_os = "espidf")]
    fn read_raw(&self) -> Option<u16> {
        hw_init::adc1_read(self.channel)
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_raw(&self) -> Option<u16> {
        match SIM_ROOM_ADC.load(Ordering::Relaxed) {
            0 => None,
            raw => Some(raw),
        }
    }
}

/// Convert a 12-bit divider reading; `None` for rail readings (open/short).
pub fn adc_to_celsius(raw: u16) -> Option<f32> {
    let voltage = (f32::from(raw) / ADC_MAX) * V_REF;
    if voltage <= 0.01 || voltage >= V_REF - 0.01 {
        return None;
    }
    let r_ntc = R_DIVIDER * voltage / (V_REF - voltage);
    let inv_t = (1.0 / T25_K) + (1.0 / BETA) * (r_ntc / R25).ln();
    if inv_t <= 0.0 {
        return None;
    }
    Some((1.0 / inv_t) - 273.15)
}
