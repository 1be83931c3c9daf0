//! Heater commands and their wire constants.

use serde::{Deserialize, Serialize};

/// A heater remote command. Values are the stable wire values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Command {
    None = 0x00,
    On = 0x01,
    Off = 0x02,
    TempUp = 0x03,
    TempDown = 0x04,
}

/// Whether a frame carries a live command or its acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameKind {
    Command,
    Ack,
}

impl Command {
    /// Every command that has a wire form.
    pub const ALL: [Command; 4] = [Command::On, Command::Off, Command::TempUp, Command::TempDown];

    pub const fn wire_value(self) -> u8 {
        self as u8
    }

    pub const fn from_wire_value(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::None),
            0x01 => Some(Self::On),
            0x02 => Some(Self::Off),
            0x03 => Some(Self::TempUp),
            0x04 => Some(Self::TempDown),
            _ => None,
        }
    }

    /// Command byte placed in the packet for this command and frame kind.
    /// Acks use their own constant per command rather than a flag bit.
    pub const fn packet_byte(self, kind: FrameKind) -> Option<u8> {
        let byte = match (self, kind) {
            (Self::None, _) => return None,
            (Self::On, FrameKind::Command) => 0x01,
            (Self::Off, FrameKind::Command) => 0x02,
            (Self::TempUp, FrameKind::Command) => 0x03,
            (Self::TempDown, FrameKind::Command) => 0x04,
            (Self::On, FrameKind::Ack) => 0xA1,
            (Self::Off, FrameKind::Ack) => 0xA2,
            (Self::TempUp, FrameKind::Ack) => 0xA3,
            (Self::TempDown, FrameKind::Ack) => 0xA4,
        };
        Some(byte)
    }

    /// Inverse of [`packet_byte`](Self::packet_byte).
    pub const fn from_packet_byte(byte: u8) -> Option<(Self, FrameKind)> {
        match byte {
            0x01 => Some((Self::On, FrameKind::Command)),
            0x02 => Some((Self::Off, FrameKind::Command)),
            0x03 => Some((Self::TempUp, FrameKind::Command)),
            0x04 => Some((Self::TempDown, FrameKind::Command)),
            0xA1 => Some((Self::On, FrameKind::Ack)),
            0xA2 => Some((Self::Off, FrameKind::Ack)),
            0xA3 => Some((Self::TempUp, FrameKind::Ack)),
            0xA4 => Some((Self::TempDown, FrameKind::Ack)),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::On => "ON",
            Self::Off => "OFF",
            Self::TempUp => "TEMP_UP",
            Self::TempDown => "TEMP_DOWN",
        }
    }
}

impl core::fmt::Display for Command {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
