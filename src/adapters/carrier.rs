//! IR LED carrier adapters.
//!
//! | Adapter        | Implements     | Connects to                       |
//! |----------------|----------------|-----------------------------------|
//! | `LedcCarrier`  | CarrierOutput  | LEDC channel + busy-wait delay    |
//! | `NullCarrier`  | CarrierOutput  | nothing (board without an IR LED) |
//!
//! A mark drives the LEDC channel at 50 % duty for its duration, a space
//! holds it at 0. Timing comes from an `embedded_hal` busy-wait delay
//! (`Ets` on the device) since a frame is only ~70 ms long.

use embedded_hal::delay::DelayNs;

use crate::drivers::hw_init;
use crate::ir::timing::{Level, Pulse};
use crate::ir::transmitter::{CarrierConfig, CarrierOutput};

pub struct LedcCarrier<D> {
    channel: u32,
    on_duty: u32,
    delay: D,
}

impl<D: DelayNs> LedcCarrier<D> {
    /// The channel must already be configured by
    /// [`hw_init::init_peripherals`].
    pub fn new(channel: u32, carrier: &CarrierConfig, delay: D) -> Self {
        Self {
            channel,
            on_duty: hw_init::carrier_duty(carrier.resolution_bits),
            delay,
        }
    }

    pub fn delay(&self) -> &D {
        &self.delay
    }
}

impl<D: DelayNs> CarrierOutput for LedcCarrier<D> {
    fn is_available(&self) -> bool {
        self.on_duty != 0
    }

    fn emit(&mut self, pulses: &[Pulse]) {
        for pulse in pulses {
            let duty = match pulse.level {
                Level::Mark => self.on_duty,
                Level::Space => 0,
            };
            hw_init::ledc_set(self.channel, duty);
            self.delay.delay_us(u32::from(pulse.duration_us));
        }
        hw_init::ledc_set(self.channel, 0);
    }
}

/// Stand-in for boards without an IR LED; every send fails with
/// `HwUnavailable`.
#[derive(Debug, Default)]
pub struct NullCarrier;

impl CarrierOutput for NullCarrier {
    fn is_available(&self) -> bool {
        false
    }

    fn emit(&mut self, _pulses: &[Pulse]) {}
}
