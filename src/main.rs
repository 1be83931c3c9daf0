//! Retrofit bridge firmware: main entry point.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                     Adapters (outer ring)                     │
//! │                                                               │
//! │  LedcCarrier     IrReceiver      HubInbox      LogEventSink   │
//! │  (CarrierOutput) (FrameSource)   (CmdSource)   + EventLog     │
//! │                                                               │
//! │  ─────────────── Port Trait Boundary ──────────────────       │
//! │                                                               │
//! │  ┌───────────────────────────────────────────────────────┐    │
//! │  │        DeliveryController (pure logic)                │    │
//! │  │  arbitration · ack/retry · scheduler · thermostat     │    │
//! │  └───────────────────────────────────────────────────────┘    │
//! │                                                               │
//! │  SignalCapture ◀── GPIO ISR (receiver edges)                  │
//! └───────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_svc::hal::delay::{Ets, FreeRtos};
use log::{info, warn};

use retrofit::adapters::carrier::LedcCarrier;
use retrofit::adapters::event_log::EventLog;
use retrofit::adapters::hub::HubInbox;
use retrofit::adapters::log_sink::LogEventSink;
use retrofit::adapters::time::Esp32TimeAdapter;
use retrofit::app::controller::{DeliveryController, TickInput};
use retrofit::clock::WallClock;
use retrofit::config::BridgeConfig;
use retrofit::drivers::{hw_init, watchdog::LoopWatchdog};
use retrofit::ir::capture::{IrReceiver, SignalCapture};
use retrofit::ir::codec::ProtocolCodec;
use retrofit::ir::transmitter::Transmitter;
use retrofit::pins;
use retrofit::sensors::room_temperature::RoomTemperatureSensor;

/// Receiver edge buffer, shared with the GPIO ISR.
static CAPTURE: SignalCapture = SignalCapture::new();

const ROOM_SAMPLE_INTERVAL_MS: u32 = 1_000;
const STATUS_INTERVAL_MS: u32 = 60_000;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Retrofit bridge v{}                 ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let config = BridgeConfig::default();
    config.validate().map_err(retrofit::error::Error::from)?;
    let carrier = config.carrier();

    // ── 3. Peripherals ────────────────────────────────────────
    hw_init::init_peripherals(&carrier).map_err(|e| anyhow::anyhow!("HAL init failed: {}", e))?;
    if let Err(e) = hw_init::init_ir_rx_isr(&CAPTURE) {
        log::error!("IR RX ISR init failed: {}; acks will never arrive", e);
    }
    let mut watchdog = LoopWatchdog::default();
    let time = Esp32TimeAdapter::new();

    // ── 4. IR link + controller ───────────────────────────────
    let codec = ProtocolCodec::new(config.address());
    let mut tx = Transmitter::new(LedcCarrier::new(pins::IR_LEDC_CHANNEL, &carrier, Ets), codec, carrier);
    if let Err(e) = tx.begin() {
        warn!("IR transmitter unavailable ({}); commands will fail with code {}", e, e.code());
    }

    let mut controller = DeliveryController::new(tx, &config);
    let boot_ms = time.now_ms();
    for spec in &config.default_schedule {
        if let Err(e) = controller.scheduler_mut().add_spec(*spec, boot_ms) {
            warn!("Default schedule entry {:?} rejected: {}", spec, e);
        }
    }
    info!("Scheduler: {} entries loaded", controller.scheduler().active_count());
    let mut receiver = IrReceiver::new(&CAPTURE, codec);
    let mut hub = HubInbox::new();
    let mut sinks = (LogEventSink::new(), EventLog::new());
    let mut wall = WallClock::new(config.utc_offset_secs);
    let mut room = RoomTemperatureSensor::new(pins::ROOM_TEMP_ADC_CHANNEL);

    info!("System ready. Entering delivery loop.");

    // ── 5. Delivery loop ──────────────────────────────────────
    let mut room_c = None;
    let mut last_room_sample_ms = time.now_ms();
    let mut last_status_ms = time.now_ms();

    loop {
        let now_ms = time.now_ms();

        if !wall.is_valid() && wall.refresh_from_system_time(now_ms) {
            info!("Wall clock set from system time");
        }

        if room_c.is_none() || now_ms.wrapping_sub(last_room_sample_ms) >= ROOM_SAMPLE_INTERVAL_MS {
            room_c = room.read();
            last_room_sample_ms = now_ms;
        }

        let input = TickInput {
            now_ms,
            now_us: time.now_us(),
            wall: wall.now(now_ms),
            room_temperature_c: room_c,
        };
        controller.tick(&input, &mut hub, &mut receiver, &mut sinks);

        if now_ms.wrapping_sub(last_status_ms) >= STATUS_INTERVAL_MS {
            last_status_ms = now_ms;
            let health = controller.health();
            info!(
                "STATUS | power={} heater={} target={:.1}\u{00b0}C room={:?} | log={} entries | max loop gap {} ms",
                health.power_enabled,
                health.heater_commanded_on,
                health.target_temperature_c,
                room_c,
                sinks.1.len(),
                watchdog.max_gap_ms()
            );
            if let Some(next) = controller.scheduler().next_planned_command(now_ms, &input.wall) {
                info!(
                    "SCHED  | next={} in {}s ({})",
                    next.command,
                    next.due_in_secs,
                    if next.uses_wall_clock { "daily" } else { "relative" }
                );
            }
            let stats = CAPTURE.stats();
            if stats.noise_edges != 0 || stats.overwritten_frames != 0 {
                info!(
                    "RXSTAT | noise={} overflow={} overwritten={}",
                    stats.noise_edges, stats.overflow_pulses, stats.overwritten_frames
                );
            }
        }

        watchdog.feed(time.now_ms());
        FreeRtos::delay_ms(config.control_loop_interval_ms);
    }
}
