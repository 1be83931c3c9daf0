//! GPIO / peripheral pin assignments for the retrofit bridge board.
//!
//! Every driver references this module rather than hard-coding pin numbers.

// ---------------------------------------------------------------------------
// IR link
// ---------------------------------------------------------------------------

/// IR LED driver transistor base (LEDC carrier output).
pub const IR_TX_GPIO: i32 = 4;
/// Demodulating IR receiver output (TSOP-style, idle HIGH).
pub const IR_RX_GPIO: i32 = 15;

/// LEDC channel / timer dedicated to the IR carrier.
pub const IR_LEDC_CHANNEL: u32 = 0;
pub const IR_LEDC_TIMER: u32 = 0;

// ---------------------------------------------------------------------------
// Room temperature (NTC thermistor, 10 kΩ @ 25 °C, divider to ADC1)
// ---------------------------------------------------------------------------

/// ADC1 channel 6 (GPIO 34 on ESP32).
pub const ROOM_TEMP_ADC_GPIO: i32 = 34;
pub const ROOM_TEMP_ADC_CHANNEL: u32 = 6;
