//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing one tagged line per bridge event to
//! the `log` facade (ESP-IDF logger on the device, whatever the test
//! harness installs on the host).

use log::{debug, info, warn};

use crate::app::events::{BridgeEvent, EventStamp};
use crate::app::ports::EventSink;

/// Adapter that logs every [`BridgeEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, stamp: &EventStamp, event: &BridgeEvent) {
        let t = stamp.uptime_ms;
        match *event {
            BridgeEvent::CommandAccepted { origin, command } => {
                info!("CMD   | t={}ms | src={} | cmd={}", t, origin.label(), command);
            }
            BridgeEvent::CommandSent { command, attempt } => {
                info!("TX    | t={}ms | cmd={} | attempt={}", t, command, attempt);
            }
            BridgeEvent::TransmitFailed { command, failure } => {
                warn!("TXERR | t={}ms | cmd={} | code={} ({})", t, command, failure.code(), failure);
            }
            BridgeEvent::FrameReceived(frame) => {
                debug!(
                    "RX    | t={}ms | cmd={} | {}",
                    t,
                    frame.command,
                    if frame.is_ack() { "ack" } else { "command" }
                );
            }
            BridgeEvent::AckReceived { command, attempts } => {
                info!("ACK   | t={}ms | cmd={} | attempts={}", t, command, attempts);
            }
            BridgeEvent::AckIgnored { command } => {
                debug!("ACK   | t={}ms | cmd={} | not pending, ignored", t, command);
            }
            BridgeEvent::CommandDropped { command, attempts } => {
                warn!("DROP  | t={}ms | cmd={} | attempts={}", t, command, attempts);
            }
            BridgeEvent::StateChanged { from, to } => {
                info!("STATE | t={}ms | {:?} -> {:?}", t, from, to);
            }
            BridgeEvent::ThermostatUpdated {
                power_enabled,
                target_temperature_c,
            } => {
                info!(
                    "THERM | t={}ms | power={} | target={:.1}\u{00b0}C",
                    t,
                    if power_enabled { "ON" } else { "OFF" },
                    target_temperature_c
                );
            }
            BridgeEvent::HeaterApplied { command, applied } => {
                info!("HEAT  | t={}ms | cmd={} | applied={}", t, command, applied);
            }
            BridgeEvent::AckSent { command } => {
                info!("ACKTX | t={}ms | cmd={}", t, command);
            }
            BridgeEvent::LearningStarted { command } => {
                info!("LEARN | t={}ms | cmd={} | waiting", t, command);
            }
            BridgeEvent::LearningSucceeded { command, pulses } => {
                info!("LEARN | t={}ms | cmd={} | captured {} pulses", t, command, pulses);
            }
            BridgeEvent::LearningTimedOut { command } => {
                warn!("LEARN | t={}ms | cmd={} | timed out", t, command);
            }
        }
    }
}
