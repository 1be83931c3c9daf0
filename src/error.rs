//! Unified error types for the retrofit firmware.
//!
//! Every subsystem error is a small `Copy` enum so it can travel through the
//! control loop and into log events without allocation. The top-level
//! [`Error`] collects them for callers that only want one type.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A packet could not be encoded or decoded.
    Codec(CodecError),
    /// An IR transmission attempt was refused.
    Tx(TxFailure),
    /// A schedule entry was rejected.
    Schedule(ScheduleError),
    /// Configuration is invalid.
    Config(&'static str),
    /// Peripheral initialisation failed.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Codec(e) => write!(f, "codec: {e}"),
            Self::Tx(e) => write!(f, "tx: {e}"),
            Self::Schedule(e) => write!(f, "schedule: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Codec errors
// ---------------------------------------------------------------------------

/// Why a packet could not be built or accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// `Command::None` has no wire representation.
    NoWireForm,
    /// Address bytes match neither the classic nor the extended form.
    AddressMismatch,
    /// The inverse byte is not the complement of the command byte.
    ChecksumMismatch,
    /// The command byte is not a known command or ack constant.
    UnknownCommand(u8),
    /// The pulse train did not contain a decodable frame.
    BadTiming,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoWireForm => write!(f, "command has no wire form"),
            Self::AddressMismatch => write!(f, "address mismatch"),
            Self::ChecksumMismatch => write!(f, "command checksum mismatch"),
            Self::UnknownCommand(b) => write!(f, "unknown command byte 0x{b:02X}"),
            Self::BadTiming => write!(f, "pulse timing out of tolerance"),
        }
    }
}

impl From<CodecError> for Error {
    fn from(e: CodecError) -> Self {
        Self::Codec(e)
    }
}

// ---------------------------------------------------------------------------
// Transmit failures
// ---------------------------------------------------------------------------

/// Reason a transmit attempt was refused. Success is `Ok(())`, which
/// corresponds to failure code 0 on the wire and in the event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TxFailure {
    NotInitialized = 1,
    InvalidCommand = 2,
    InvalidConfig = 3,
    HwUnavailable = 4,
}

impl TxFailure {
    /// Stable numeric code used in log entries.
    pub const fn code(self) -> u8 {
        self as u8
    }

    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::NotInitialized),
            2 => Some(Self::InvalidCommand),
            3 => Some(Self::InvalidConfig),
            4 => Some(Self::HwUnavailable),
            _ => None,
        }
    }
}

impl fmt::Display for TxFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInitialized => write!(f, "transmitter not initialised"),
            Self::InvalidCommand => write!(f, "invalid command"),
            Self::InvalidConfig => write!(f, "invalid carrier configuration"),
            Self::HwUnavailable => write!(f, "IR hardware unavailable"),
        }
    }
}

impl From<TxFailure> for Error {
    fn from(e: TxFailure) -> Self {
        Self::Tx(e)
    }
}

// ---------------------------------------------------------------------------
// Scheduler errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleError {
    /// All slots are occupied.
    TableFull,
    /// Hour, minute or second out of range.
    InvalidTime,
    /// Weekday mask selects no day.
    EmptyWeekdayMask,
    /// `Command::None` cannot be scheduled.
    NoCommand,
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TableFull => write!(f, "schedule table full"),
            Self::InvalidTime => write!(f, "time of day out of range"),
            Self::EmptyWeekdayMask => write!(f, "weekday mask is empty"),
            Self::NoCommand => write!(f, "no command to schedule"),
        }
    }
}

impl From<ScheduleError> for Error {
    fn from(e: ScheduleError) -> Self {
        Self::Schedule(e)
    }
}

/// Convenience alias used throughout the firmware.
pub type Result<T> = core::result::Result<T, Error>;
