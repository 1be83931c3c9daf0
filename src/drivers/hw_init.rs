//! One-shot peripheral bring-up for the bridge board.
//!
//! Configures the room-temperature ADC channel, the LEDC carrier for the
//! IR LED and the IR receiver input using raw ESP-IDF sys calls. Called
//! once from `main()` before the loop starts. On the host every function
//! is a no-op so the adapters built on top stay testable.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;
#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
use crate::ir::capture::SignalCapture;
use crate::ir::transmitter::CarrierConfig;
#[cfg(target_os = "espidf")]
use crate::pins;

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    AdcInitFailed(i32),
    GpioConfigFailed(i32),
    LedcInitFailed(i32),
    IsrInstallFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AdcInitFailed(rc)    => write!(f, "ADC1 init failed (rc={})", rc),
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::LedcInitFailed(rc)   => write!(f, "LEDC carrier config failed (rc={})", rc),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR install failed (rc={})", rc),
        }
    }
}

impl From<HwInitError> for crate::error::Error {
    fn from(_: HwInitError) -> Self {
        Self::Init("peripheral initialisation failed")
    }
}

/// 50 % duty at the given resolution.
pub const fn carrier_duty(resolution_bits: u8) -> u32 {
    if resolution_bits == 0 || resolution_bits > 20 {
        return 0;
    }
    1u32 << (resolution_bits - 1)
}

#[cfg(target_os = "espidf")]
pub fn init_peripherals(carrier: &CarrierConfig) -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before the loop; single-threaded.
    unsafe {
        init_adc()?;
        init_ir_rx_gpio()?;
        init_ledc_carrier(carrier)?;
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals(carrier: &CarrierConfig) -> Result<(), HwInitError> {
    log::info!(
        "hw_init(sim): peripheral init skipped ({} Hz carrier)",
        carrier.frequency_hz
    );
    Ok(())
}

// ── ADC (oneshot) ─────────────────────────────────────────────

#[cfg(target_os = "espidf")]
static mut ADC1_HANDLE: adc_oneshot_unit_handle_t = core::ptr::null_mut();

/// SAFETY: only from the init path or the main-loop read path; `init_adc()`
/// completes before the loop starts.
#[cfg(target_os = "espidf")]
unsafe fn adc1_handle() -> adc_oneshot_unit_handle_t {
    unsafe { ADC1_HANDLE }
}

#[cfg(target_os = "espidf")]
unsafe fn init_adc() -> Result<(), HwInitError> {
    let init_cfg = adc_oneshot_unit_init_cfg_t {
        unit_id: adc_unit_t_ADC_UNIT_1,
        ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
        ..Default::default()
    };
    // SAFETY: ADC1_HANDLE is only written here, once at boot.
    let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &raw mut ADC1_HANDLE) };
    if ret != ESP_OK as i32 { return Err(HwInitError::AdcInitFailed(ret)); }

    let chan_cfg = adc_oneshot_chan_cfg_t {
        atten: adc_atten_t_ADC_ATTEN_DB_12,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
    };
    let ret = unsafe { adc_oneshot_config_channel(adc1_handle(), pins::ROOM_TEMP_ADC_CHANNEL, &chan_cfg) };
    if ret != ESP_OK as i32 { return Err(HwInitError::AdcInitFailed(ret)); }

    info!("hw_init: ADC1 CH{} configured (room NTC)", pins::ROOM_TEMP_ADC_CHANNEL);
    Ok(())
}

/// Raw 12-bit reading, `None` on a driver error.
#[cfg(target_os = "espidf")]
pub fn adc1_read(channel: u32) -> Option<u16> {
    let mut raw: i32 = 0;
    // SAFETY: adc1_handle() contract; single-threaded main-loop access.
    let ret = unsafe { adc_oneshot_read(adc1_handle(), channel, &mut raw) };
    if ret != ESP_OK as i32 {
        return None;
    }
    Some(raw.max(0) as u16)
}

#[cfg(not(target_os = "espidf"))]
pub fn adc1_read(_channel: u32) -> Option<u16> {
    None
}

// ── IR receiver input ─────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_ir_rx_gpio() -> Result<(), HwInitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pins::IR_RX_GPIO,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_ANYEDGE,
    };
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 { return Err(HwInitError::GpioConfigFailed(ret)); }
    info!("hw_init: IR RX on GPIO{}", pins::IR_RX_GPIO);
    Ok(())
}

// ── LEDC carrier ──────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_ledc_carrier(carrier: &CarrierConfig) -> Result<(), HwInitError> {
    let timer = ledc_timer_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        timer_num: pins::IR_LEDC_TIMER,
        duty_resolution: u32::from(carrier.resolution_bits),
        freq_hz: carrier.frequency_hz,
        clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
        ..Default::default()
    };
    let ret = unsafe { ledc_timer_config(&timer) };
    if ret != ESP_OK { return Err(HwInitError::LedcInitFailed(ret)); }

    // Channel starts idle (duty 0); marks raise it to 50 %.
    let ret = unsafe { ledc_channel_config(&ledc_channel_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        channel: pins::IR_LEDC_CHANNEL,
        timer_sel: pins::IR_LEDC_TIMER,
        gpio_num: pins::IR_TX_GPIO,
        duty: 0,
        hpoint: 0,
        ..Default::default()
    }) };
    if ret != ESP_OK { return Err(HwInitError::LedcInitFailed(ret)); }

    info!(
        "hw_init: LEDC carrier {} Hz / {}-bit on GPIO{}",
        carrier.frequency_hz, carrier.resolution_bits, pins::IR_TX_GPIO
    );
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn ledc_set(channel: u32, duty: u32) {
    // SAFETY: channel configured in init_ledc_carrier(); only the main loop
    // writes the duty register.
    unsafe {
        ledc_set_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel, duty);
        ledc_update_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn ledc_set(_channel: u32, _duty: u32) {}

// ── GPIO ISR ──────────────────────────────────────────────────

/// `arg` is the `&'static SignalCapture` registered below.
#[cfg(target_os = "espidf")]
unsafe extern "C" fn ir_rx_isr(arg: *mut core::ffi::c_void) {
    // SAFETY: esp_timer_get_time is an RTC counter read; safe in ISR context.
    let now_us = unsafe { esp_timer_get_time() } as u32;
    // SAFETY: arg was produced from a `&'static SignalCapture` in
    // init_ir_rx_isr() and is never freed.
    let capture = unsafe { &*(arg as *const SignalCapture) };
    capture.on_edge(now_us);
}

/// Install the GPIO ISR service and route receiver edges into `capture`.
#[cfg(target_os = "espidf")]
pub fn init_ir_rx_isr(capture: &'static SignalCapture) -> Result<(), HwInitError> {
    // SAFETY: ESP_ERR_INVALID_STATE means the service was already installed.
    // The handler only touches `capture` inside a critical section.
    unsafe {
        let ret = gpio_install_isr_service(0);
        if ret != ESP_OK && ret != ESP_ERR_INVALID_STATE {
            return Err(HwInitError::IsrInstallFailed(ret));
        }

        let arg = core::ptr::from_ref(capture).cast_mut().cast::<core::ffi::c_void>();
        let ret = gpio_isr_handler_add(pins::IR_RX_GPIO, Some(ir_rx_isr), arg);
        if ret != ESP_OK {
            return Err(HwInitError::IsrInstallFailed(ret));
        }
        gpio_intr_enable(pins::IR_RX_GPIO);
    }
    info!("hw_init: IR RX ISR installed");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_ir_rx_isr(_capture: &'static crate::ir::capture::SignalCapture) -> Result<(), HwInitError> {
    log::info!("hw_init(sim): IR RX ISR skipped");
    Ok(())
}
