//! Bridge configuration parameters.
//!
//! All tunables for IR delivery and the local thermostat loop. Pin
//! assignments live in `pins.rs`; everything here can change without
//! touching wiring.

use heapless::Vec;
use serde::{Deserialize, Serialize};

use crate::ir::codec::DeviceAddress;
use crate::ir::command::Command;
use crate::ir::transmitter::CarrierConfig;
use crate::scheduler::{MAX_ENTRIES, ScheduleSpec, WeekdayMask};

/// Upper bound for `max_retries`.
pub const MAX_RETRIES_LIMIT: u8 = 10;

/// Core bridge configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    // --- IR link ---
    /// Heater device address (classic when high byte == !low byte).
    pub device_address: u16,
    /// IR carrier frequency in Hz.
    pub carrier_freq_hz: u32,
    /// LEDC duty resolution for the carrier.
    pub pwm_resolution_bits: u8,

    // --- Delivery ---
    /// Time to wait for an ack before retransmitting (ms).
    pub ack_timeout_ms: u32,
    /// Retransmissions before a command is dropped.
    pub max_retries: u8,
    /// Thermostat commands are held back this long after a drop (ms).
    pub drop_cooldown_ms: u32,

    // --- Thermostat ---
    /// Target room temperature at boot (°C).
    pub default_target_temperature_c: f32,
    /// Half-width of the heat-demand band (°C).
    pub hysteresis_c: f32,
    /// Whether scheduled commands are serviced.
    pub scheduler_enabled: bool,
    /// Entries registered with the scheduler at boot.
    pub default_schedule: Vec<ScheduleSpec, MAX_ENTRIES>,

    // --- Timing ---
    /// Main loop period (ms).
    pub control_loop_interval_ms: u32,
    /// Local time offset from UTC (s).
    pub utc_offset_secs: i32,
    /// Learning mode gives up after this long (ms).
    pub learning_timeout_ms: u32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            // IR link
            device_address: 0xBF40,
            carrier_freq_hz: 38_000,
            pwm_resolution_bits: 8,

            // Delivery
            ack_timeout_ms: 120,
            max_retries: 2,
            drop_cooldown_ms: 10_000,

            // Thermostat
            default_target_temperature_c: 21.0,
            hysteresis_c: 0.5,
            scheduler_enabled: true,
            default_schedule: default_schedule(),

            // Timing
            control_loop_interval_ms: 10,
            utc_offset_secs: 0,
            learning_timeout_ms: 15_000,
        }
    }
}

/// Boot demo sequence plus the daily on/off pair.
fn default_schedule() -> Vec<ScheduleSpec, MAX_ENTRIES> {
    let daily = |hour, command| ScheduleSpec::Daily {
        hour,
        minute: 0,
        second: 0,
        weekdays: WeekdayMask::ALL,
        command,
    };
    [
        ScheduleSpec::AfterBoot { delay_ms: 2_000, command: Command::On },
        ScheduleSpec::AfterBoot { delay_ms: 6_000, command: Command::TempUp },
        ScheduleSpec::AfterBoot { delay_ms: 12_000, command: Command::Off },
        daily(7, Command::On),
        daily(22, Command::Off),
    ]
    .into_iter()
    .collect()
}

/// Errors from [`BridgeConfig::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A field failed range validation; the string names it.
    ValidationFailed(&'static str),
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
        }
    }
}

impl From<ConfigError> for crate::error::Error {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::ValidationFailed(msg) => Self::Config(msg),
        }
    }
}

impl BridgeConfig {
    /// Reject values that would make the bridge misbehave rather than
    /// clamping them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.carrier_freq_hz == 0 {
            return Err(ConfigError::ValidationFailed("carrier_freq_hz must be non-zero"));
        }
        if self.pwm_resolution_bits == 0 || self.pwm_resolution_bits > 14 {
            return Err(ConfigError::ValidationFailed("pwm_resolution_bits must be 1..=14"));
        }
        if self.ack_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed("ack_timeout_ms must be non-zero"));
        }
        if self.max_retries > MAX_RETRIES_LIMIT {
            return Err(ConfigError::ValidationFailed("max_retries must be 0..=10"));
        }
        if !(self.hysteresis_c > 0.0 && self.hysteresis_c <= 5.0) {
            return Err(ConfigError::ValidationFailed("hysteresis_c must be in (0, 5]"));
        }
        if !(5.0..=35.0).contains(&self.default_target_temperature_c) {
            return Err(ConfigError::ValidationFailed("default_target_temperature_c must be 5..=35"));
        }
        if self.control_loop_interval_ms == 0 || self.control_loop_interval_ms >= self.ack_timeout_ms {
            return Err(ConfigError::ValidationFailed(
                "control_loop_interval_ms must be non-zero and below ack_timeout_ms",
            ));
        }
        if self.utc_offset_secs.abs() > 14 * 3600 {
            return Err(ConfigError::ValidationFailed("utc_offset_secs must be within ±14h"));
        }
        if self.default_schedule.iter().any(|spec| spec.check().is_err()) {
            return Err(ConfigError::ValidationFailed("default_schedule has an invalid entry"));
        }
        Ok(())
    }

    pub fn address(&self) -> DeviceAddress {
        DeviceAddress(self.device_address)
    }

    pub fn carrier(&self) -> CarrierConfig {
        CarrierConfig {
            frequency_hz: self.carrier_freq_hz,
            resolution_bits: self.pwm_resolution_bits,
        }
    }
}
