//! Packet codec: `Command` + frame kind ⇄ four-byte packet.
//!
//! Packet layout (transmitted in this byte order):
//!
//! | byte | classic address       | extended address      |
//! |------|-----------------------|-----------------------|
//! | 0    | address               | address low byte      |
//! | 1    | `!address`            | address high byte     |
//! | 2    | command / ack byte    | command / ack byte    |
//! | 3    | `!command byte`       | `!command byte`       |
//!
//! Both functions are pure so they can run on the polling path and in tests
//! alike.

use serde::{Deserialize, Serialize};

use super::command::{Command, FrameKind};
use super::timing::{self, PACKET_BYTES, Pulse, FRAME_PULSES};
use crate::error::CodecError;

/// 16-bit device address. When the high byte is the complement of the low
/// byte the packet uses the classic single-byte form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceAddress(pub u16);

impl DeviceAddress {
    pub const fn low(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    pub const fn high(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn is_classic(self) -> bool {
        self.high() == !self.low()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet {
    pub address: [u8; 2],
    pub command: u8,
    pub command_inverse: u8,
}

impl Packet {
    pub const fn to_bytes(self) -> [u8; PACKET_BYTES] {
        [self.address[0], self.address[1], self.command, self.command_inverse]
    }

    pub const fn from_bytes(bytes: [u8; PACKET_BYTES]) -> Self {
        Self {
            address: [bytes[0], bytes[1]],
            command: bytes[2],
            command_inverse: bytes[3],
        }
    }

    /// Mark/space layout of this packet.
    pub fn to_pulses(self) -> [Pulse; FRAME_PULSES] {
        timing::encode_pulses(self.to_bytes())
    }

    /// Parse captured inter-edge durations.
    pub fn from_pulses(pulses: &[u16]) -> Result<Self, CodecError> {
        timing::decode_pulses(pulses).map(Self::from_bytes)
    }
}

/// A successfully decoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedFrame {
    pub command: Command,
    pub kind: FrameKind,
}

impl DecodedFrame {
    pub const fn is_ack(&self) -> bool {
        matches!(self.kind, FrameKind::Ack)
    }
}

/// Encoder/decoder bound to this bridge's device address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolCodec {
    address: DeviceAddress,
}

impl ProtocolCodec {
    pub const fn new(address: DeviceAddress) -> Self {
        Self { address }
    }

    pub const fn address(&self) -> DeviceAddress {
        self.address
    }

    pub fn encode(&self, command: Command, kind: FrameKind) -> Result<Packet, CodecError> {
        let byte = command.packet_byte(kind).ok_or(CodecError::NoWireForm)?;
        let second = if self.address.is_classic() {
            !self.address.low()
        } else {
            self.address.high()
        };
        Ok(Packet {
            address: [self.address.low(), second],
            command: byte,
            command_inverse: !byte,
        })
    }

    pub fn decode(&self, packet: &Packet) -> Result<DecodedFrame, CodecError> {
        if !self.address_matches(packet.address) {
            return Err(CodecError::AddressMismatch);
        }
        if packet.command_inverse != !packet.command {
            return Err(CodecError::ChecksumMismatch);
        }
        let (command, kind) =
            Command::from_packet_byte(packet.command).ok_or(CodecError::UnknownCommand(packet.command))?;
        Ok(DecodedFrame { command, kind })
    }

    /// Full path from captured pulses to a frame addressed to us.
    pub fn decode_pulses(&self, pulses: &[u16]) -> Result<DecodedFrame, CodecError> {
        let packet = Packet::from_pulses(pulses)?;
        self.decode(&packet)
    }

    fn address_matches(&self, address: [u8; 2]) -> bool {
        if address[1] == !address[0] {
            address[0] == self.address.low()
        } else {
            address[0] == self.address.low() && address[1] == self.address.high()
        }
    }
}
