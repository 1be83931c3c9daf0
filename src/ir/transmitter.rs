//! IR transmitter: packet → mark/space timing on a carrier output.
//!
//! Every send is checked in a fixed order before anything reaches the LED:
//!
//! 1. output hardware present     → [`TxFailure::HwUnavailable`]
//! 2. [`Transmitter::begin`] ran  → [`TxFailure::NotInitialized`]
//! 3. carrier parameters non-zero → [`TxFailure::InvalidConfig`]
//! 4. encode, then re-decode the packet and compare → [`TxFailure::InvalidCommand`]
//!
//! Step 4 keeps a drifting encoder from ever putting a malformed frame on
//! the wire.

use heapless::Vec;
use log::{debug, info, warn};

use super::capture::RawFrame;
use super::codec::{DecodedFrame, ProtocolCodec};
use super::command::{Command, FrameKind};
use super::timing::{MAX_PULSES, Pulse};
use crate::app::ports::IrTransmit;
use crate::error::TxFailure;

/// The physical IR LED, seen as a modulated carrier that is either on
/// (mark) or off (space) for a given time.
pub trait CarrierOutput {
    /// Whether the LED driver exists on this build / board.
    fn is_available(&self) -> bool;

    /// Play the pulses back to back. Blocks for the length of the frame.
    fn emit(&mut self, pulses: &[Pulse]);
}

/// Carrier parameters the output was configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CarrierConfig {
    pub frequency_hz: u32,
    pub resolution_bits: u8,
}

impl CarrierConfig {
    pub const fn is_valid(&self) -> bool {
        self.frequency_hz != 0 && self.resolution_bits != 0
    }
}

pub struct Transmitter<O> {
    output: O,
    codec: ProtocolCodec,
    carrier: CarrierConfig,
    initialized: bool,
    frames_sent: u32,
}

impl<O: CarrierOutput> Transmitter<O> {
    pub fn new(output: O, codec: ProtocolCodec, carrier: CarrierConfig) -> Self {
        Self {
            output,
            codec,
            carrier,
            initialized: false,
            frames_sent: 0,
        }
    }

    /// Bring the transmitter up. Fails only when the output hardware is
    /// missing; carrier parameters are checked on every send.
    pub fn begin(&mut self) -> Result<(), TxFailure> {
        if !self.output.is_available() {
            self.initialized = false;
            warn!("IR TX: carrier output unavailable");
            return Err(TxFailure::HwUnavailable);
        }
        if !self.carrier.is_valid() {
            warn!(
                "IR TX: carrier config invalid ({} Hz, {} bits)",
                self.carrier.frequency_hz, self.carrier.resolution_bits
            );
        }
        self.initialized = true;
        info!(
            "IR TX: ready ({} Hz carrier, {}-bit duty, address 0x{:04X})",
            self.carrier.frequency_hz,
            self.carrier.resolution_bits,
            self.codec.address().0
        );
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn set_carrier(&mut self, carrier: CarrierConfig) {
        self.carrier = carrier;
    }

    pub fn frames_sent(&self) -> u32 {
        self.frames_sent
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }

    fn check_ready(&self) -> Result<(), TxFailure> {
        if !self.output.is_available() {
            return Err(TxFailure::HwUnavailable);
        }
        if !self.initialized {
            return Err(TxFailure::NotInitialized);
        }
        if !self.carrier.is_valid() {
            return Err(TxFailure::InvalidConfig);
        }
        Ok(())
    }

    fn send_frame(&mut self, command: Command, kind: FrameKind) -> Result<(), TxFailure> {
        self.check_ready()?;

        let packet = self
            .codec
            .encode(command, kind)
            .map_err(|_| TxFailure::InvalidCommand)?;
        if self.codec.decode(&packet) != Ok(DecodedFrame { command, kind }) {
            return Err(TxFailure::InvalidCommand);
        }

        self.output.emit(&packet.to_pulses());
        self.frames_sent = self.frames_sent.wrapping_add(1);
        debug!("IR TX: {:?} {} {:02X?}", kind, command, packet.to_bytes());
        Ok(())
    }
}

impl<O: CarrierOutput> IrTransmit for Transmitter<O> {
    fn send_command(&mut self, command: Command) -> Result<(), TxFailure> {
        self.send_frame(command, FrameKind::Command)
    }

    fn send_ack(&mut self, command: Command) -> Result<(), TxFailure> {
        self.send_frame(command, FrameKind::Ack)
    }

    /// Replay captured durations, alternating mark and space from a mark.
    fn send_raw(&mut self, frame: &RawFrame) -> Result<(), TxFailure> {
        self.check_ready()?;
        if frame.is_empty() {
            return Err(TxFailure::InvalidCommand);
        }

        let mut pulses: Vec<Pulse, MAX_PULSES> = Vec::new();
        for (i, &d) in frame.as_slice().iter().enumerate() {
            let pulse = if i % 2 == 0 { Pulse::mark(d) } else { Pulse::space(d) };
            if pulses.push(pulse).is_err() {
                break;
            }
        }

        self.output.emit(&pulses);
        self.frames_sent = self.frames_sent.wrapping_add(1);
        debug!("IR TX: raw frame, {} pulses", pulses.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::codec::DeviceAddress;
    use crate::ir::timing::Level;

    #[derive(Default)]
    struct RecordingCarrier {
        present: bool,
        frames: std::vec::Vec<std::vec::Vec<Pulse>>,
    }

    impl CarrierOutput for RecordingCarrier {
        fn is_available(&self) -> bool {
            self.present
        }

        fn emit(&mut self, pulses: &[Pulse]) {
            self.frames.push(pulses.to_vec());
        }
    }

    const CARRIER: CarrierConfig = CarrierConfig { frequency_hz: 38_000, resolution_bits: 8 };

    fn transmitter(present: bool) -> Transmitter<RecordingCarrier> {
        let carrier = RecordingCarrier { present, ..Default::default() };
        Transmitter::new(carrier, ProtocolCodec::new(DeviceAddress(0xBF40)), CARRIER)
    }

    #[test]
    fn missing_hardware_reported_first() {
        let mut tx = transmitter(false);
        assert_eq!(tx.begin(), Err(TxFailure::HwUnavailable));
        assert_eq!(tx.send_command(Command::On), Err(TxFailure::HwUnavailable));
        tx.set_carrier(CarrierConfig { frequency_hz: 0, resolution_bits: 0 });
        assert_eq!(tx.send_command(Command::None), Err(TxFailure::HwUnavailable));
    }

    #[test]
    fn send_before_begin_is_not_initialized() {
        let mut tx = transmitter(true);
        assert_eq!(tx.send_command(Command::On), Err(TxFailure::NotInitialized));
        assert!(tx.output().frames.is_empty());
    }

    #[test]
    fn zero_carrier_is_invalid_config() {
        let mut tx = transmitter(true);
        tx.begin().unwrap();
        tx.set_carrier(CarrierConfig { frequency_hz: 0, resolution_bits: 8 });
        assert_eq!(tx.send_command(Command::On), Err(TxFailure::InvalidConfig));
        tx.set_carrier(CarrierConfig { frequency_hz: 38_000, resolution_bits: 0 });
        assert_eq!(tx.send_ack(Command::On), Err(TxFailure::InvalidConfig));
    }

    #[test]
    fn none_is_invalid_command() {
        let mut tx = transmitter(true);
        tx.begin().unwrap();
        assert_eq!(tx.send_command(Command::None), Err(TxFailure::InvalidCommand));
        assert_eq!(tx.send_ack(Command::None), Err(TxFailure::InvalidCommand));
        assert!(tx.output().frames.is_empty());
    }

    #[test]
    fn command_frame_timing() {
        let mut tx = transmitter(true);
        tx.begin().unwrap();
        tx.send_command(Command::Off).unwrap();

        let frame = &tx.output().frames[0];
        assert_eq!(frame.len(), 68);
        assert_eq!(frame[0], Pulse::mark(9000));
        assert_eq!(frame[1], Pulse::space(4500));
        assert_eq!(frame[66], Pulse::mark(560));
        assert_eq!(frame[67], Pulse::space(560));
        assert!(frame[2..66].chunks(2).all(|c| c[0] == Pulse::mark(560)));
        assert!(frame[2..66].chunks(2).all(|c| c[1].duration_us == 560 || c[1].duration_us == 1690));
        assert_eq!(tx.frames_sent(), 1);
    }

    #[test]
    fn ack_frame_decodes_as_ack() {
        let codec = ProtocolCodec::new(DeviceAddress(0xBF40));
        let mut tx = transmitter(true);
        tx.begin().unwrap();
        tx.send_ack(Command::TempDown).unwrap();

        let durations: std::vec::Vec<u16> = tx.output().frames[0].iter().map(|p| p.duration_us).collect();
        let frame = codec.decode_pulses(&durations).unwrap();
        assert_eq!(frame, DecodedFrame { command: Command::TempDown, kind: FrameKind::Ack });
    }

    #[test]
    fn raw_frame_alternates_from_mark() {
        let mut tx = transmitter(true);
        tx.begin().unwrap();
        assert_eq!(tx.send_raw(&RawFrame::empty()), Err(TxFailure::InvalidCommand));

        tx.send_raw(&RawFrame::from_slice(&[9000, 4500, 560])).unwrap();
        let levels: std::vec::Vec<Level> = tx.output().frames[0].iter().map(|p| p.level).collect();
        assert_eq!(levels, [Level::Mark, Level::Space, Level::Mark]);
    }
}
