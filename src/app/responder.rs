//! Heater side of the link: apply received commands and acknowledge them.
//!
//! Runs on the heater's own board (or in host loopback tests against a
//! [`DeliveryController`](super::controller::DeliveryController)).
//! A retransmitted command is applied again; the controller only retries
//! when an ack was lost, so TEMP_UP/TEMP_DOWN can double-step in that case.

use log::{debug, warn};

use crate::ir::command::Command;

use super::events::{BridgeEvent, EventStamp};
use super::ports::{EventSink, FrameSource, IrTransmit};

/// Heater power and setpoint as driven by IR commands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeaterState {
    pub is_on: bool,
    pub target_temperature_c: f32,
}

impl HeaterState {
    pub const fn new(target_temperature_c: f32) -> Self {
        Self {
            is_on: false,
            target_temperature_c,
        }
    }

    /// Returns `false` for `Command::None`.
    pub fn apply(&mut self, command: Command) -> bool {
        match command {
            Command::On => self.is_on = true,
            Command::Off => self.is_on = false,
            Command::TempUp => self.target_temperature_c += 1.0,
            Command::TempDown => self.target_temperature_c -= 1.0,
            Command::None => return false,
        }
        true
    }

    /// Relay demand: on and below the setpoint.
    pub fn should_heat(&self, room_c: f32) -> bool {
        self.is_on && room_c < self.target_temperature_c
    }
}

pub struct AckResponder<T> {
    tx: T,
    heater: HeaterState,
}

impl<T: IrTransmit> AckResponder<T> {
    pub fn new(tx: T, heater: HeaterState) -> Self {
        Self { tx, heater }
    }

    /// Service every pending frame. Returns how many commands were applied.
    pub fn poll(
        &mut self,
        now_us: u32,
        stamp: &EventStamp,
        frames: &mut impl FrameSource,
        sink: &mut impl EventSink,
    ) -> usize {
        let mut applied_count = 0;
        while let Some(frame) = frames.poll_frame(now_us) {
            sink.emit(stamp, &BridgeEvent::FrameReceived(frame));
            if frame.is_ack() {
                continue;
            }

            let command = frame.command;
            let applied = self.heater.apply(command);
            sink.emit(stamp, &BridgeEvent::HeaterApplied { command, applied });
            if !applied {
                continue;
            }
            applied_count += 1;

            match self.tx.send_ack(command) {
                Ok(()) => {
                    debug!("Heater: applied {}, ack sent", command);
                    sink.emit(stamp, &BridgeEvent::AckSent { command });
                }
                Err(failure) => {
                    warn!("Heater: ack for {} failed: {}", command, failure);
                    sink.emit(stamp, &BridgeEvent::TransmitFailed { command, failure });
                }
            }
        }
        applied_count
    }

    pub fn heater(&self) -> &HeaterState {
        &self.heater
    }

    pub fn transmitter(&self) -> &T {
        &self.tx
    }

    pub fn transmitter_mut(&mut self) -> &mut T {
        &mut self.tx
    }
}
