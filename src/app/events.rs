//! Outbound bridge events.
//!
//! The controller, the heater-side responder and the learning session
//! emit these through the [`EventSink`](super::ports::EventSink) port.
//! Each event maps onto a flat [`LogEventKind`] + command + success +
//! detail code record for the ring log and analytics.

use serde::{Deserialize, Serialize};

use super::commands::CommandOrigin;
use crate::clock::WallClockSnapshot;
use crate::error::TxFailure;
use crate::ir::codec::DecodedFrame;
use crate::ir::command::Command;

/// Delivery state machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryState {
    Idle,
    WaitingAck,
}

/// Flat event category used by log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum LogEventKind {
    CommandSent = 0,
    AckReceived = 1,
    CommandDropped = 2,
    HubCommandRx = 3,
    ScheduleCommand = 4,
    StateChange = 5,
    ThermostatControl = 6,
    TransmitFailed = 7,
    IrFrameRx = 8,
    AckSent = 9,
    LearningStart = 10,
    LearningSuccess = 11,
    LearningTimeout = 12,
    AckIgnored = 13,
    DirectCommand = 14,
}

/// When an event happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventStamp {
    pub uptime_ms: u32,
    /// `YYYYMMDD`, 0 if the wall clock is not set.
    pub date_key: u32,
    pub seconds_of_day: u32,
}

impl EventStamp {
    pub fn new(uptime_ms: u32, wall: &WallClockSnapshot) -> Self {
        if wall.is_usable() {
            Self {
                uptime_ms,
                date_key: wall.date_key,
                seconds_of_day: wall.seconds_of_day,
            }
        } else {
            Self {
                uptime_ms,
                ..Self::default()
            }
        }
    }
}

/// Structured events emitted by the bridge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BridgeEvent {
    /// A source offered a command and it was accepted for delivery.
    CommandAccepted { origin: CommandOrigin, command: Command },

    /// A frame went out; `attempt` is 0 for the first transmission.
    CommandSent { command: Command, attempt: u8 },

    /// The transmitter refused the frame.
    TransmitFailed { command: Command, failure: TxFailure },

    /// A frame addressed to us was decoded.
    FrameReceived(DecodedFrame),

    /// The pending command was acknowledged.
    AckReceived { command: Command, attempts: u8 },

    /// An ack arrived for something other than the pending command.
    AckIgnored { command: Command },

    /// Retries exhausted; the command was given up.
    CommandDropped { command: Command, attempts: u8 },

    /// The delivery state machine moved.
    StateChanged { from: DeliveryState, to: DeliveryState },

    /// Local thermostat state after accepting a command.
    ThermostatUpdated { power_enabled: bool, target_temperature_c: f32 },

    /// Heater side: a received command was applied (or not).
    HeaterApplied { command: Command, applied: bool },

    /// Heater side: acknowledgment transmitted.
    AckSent { command: Command },

    LearningStarted { command: Command },
    LearningSucceeded { command: Command, pulses: u8 },
    LearningTimedOut { command: Command },
}

impl BridgeEvent {
    pub fn kind(&self) -> LogEventKind {
        match self {
            Self::CommandAccepted { origin, .. } => match origin {
                CommandOrigin::Hub => LogEventKind::HubCommandRx,
                CommandOrigin::Schedule => LogEventKind::ScheduleCommand,
                CommandOrigin::Thermostat => LogEventKind::ThermostatControl,
                CommandOrigin::Direct => LogEventKind::DirectCommand,
            },
            Self::CommandSent { .. } => LogEventKind::CommandSent,
            Self::TransmitFailed { .. } => LogEventKind::TransmitFailed,
            Self::FrameReceived(_) => LogEventKind::IrFrameRx,
            Self::AckReceived { .. } => LogEventKind::AckReceived,
            Self::AckIgnored { .. } => LogEventKind::AckIgnored,
            Self::CommandDropped { .. } => LogEventKind::CommandDropped,
            Self::StateChanged { .. } | Self::ThermostatUpdated { .. } | Self::HeaterApplied { .. } => {
                LogEventKind::StateChange
            }
            Self::AckSent { .. } => LogEventKind::AckSent,
            Self::LearningStarted { .. } => LogEventKind::LearningStart,
            Self::LearningSucceeded { .. } => LogEventKind::LearningSuccess,
            Self::LearningTimedOut { .. } => LogEventKind::LearningTimeout,
        }
    }

    /// The command this event concerns, `Command::None` for pure state events.
    pub fn command(&self) -> Command {
        match self {
            Self::CommandAccepted { command, .. }
            | Self::CommandSent { command, .. }
            | Self::TransmitFailed { command, .. }
            | Self::AckReceived { command, .. }
            | Self::AckIgnored { command }
            | Self::CommandDropped { command, .. }
            | Self::HeaterApplied { command, .. }
            | Self::AckSent { command }
            | Self::LearningStarted { command }
            | Self::LearningSucceeded { command, .. }
            | Self::LearningTimedOut { command } => *command,
            Self::FrameReceived(frame) => frame.command,
            Self::StateChanged { .. } | Self::ThermostatUpdated { .. } => Command::None,
        }
    }

    pub fn success(&self) -> bool {
        match self {
            Self::TransmitFailed { .. }
            | Self::AckIgnored { .. }
            | Self::CommandDropped { .. }
            | Self::LearningTimedOut { .. } => false,
            Self::HeaterApplied { applied, .. } => *applied,
            _ => true,
        }
    }

    /// Event-specific detail code: failure code, attempt count, ack flag,
    /// captured pulse count or new state.
    pub fn detail(&self) -> u8 {
        match self {
            Self::TransmitFailed { failure, .. } => failure.code(),
            Self::CommandSent { attempt, .. } => *attempt,
            Self::AckReceived { attempts, .. } | Self::CommandDropped { attempts, .. } => *attempts,
            Self::FrameReceived(frame) => u8::from(frame.is_ack()),
            Self::LearningSucceeded { pulses, .. } => *pulses,
            Self::StateChanged { to, .. } => *to as u8,
            Self::ThermostatUpdated { target_temperature_c, .. } => target_temperature_c.clamp(0.0, 255.0) as u8,
            _ => 0,
        }
    }
}
