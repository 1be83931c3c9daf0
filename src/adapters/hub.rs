//! Hub command inbox.
//!
//! Whatever link the smart-home hub (or an external thermostat tuner)
//! uses pushes decoded commands here; the delivery loop pulls them one
//! per tick through [`CommandSource`].

use heapless::Deque;
use log::warn;

use crate::app::ports::CommandSource;
use crate::ir::command::Command;

pub const HUB_QUEUE_DEPTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HubPushError {
    /// `Command::None` carries nothing to deliver.
    NoCommand,
    /// The queue already holds [`HUB_QUEUE_DEPTH`] commands.
    Full,
}

impl core::fmt::Display for HubPushError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NoCommand => write!(f, "no command"),
            Self::Full => write!(f, "hub queue full"),
        }
    }
}

/// FIFO of hub commands awaiting delivery.
#[derive(Debug, Default)]
pub struct HubInbox {
    queue: Deque<Command, HUB_QUEUE_DEPTH>,
}

impl HubInbox {
    pub const fn new() -> Self {
        Self { queue: Deque::new() }
    }

    pub fn push(&mut self, command: Command) -> Result<(), HubPushError> {
        if command == Command::None {
            return Err(HubPushError::NoCommand);
        }
        self.queue.push_back(command).map_err(|_| {
            warn!("Hub inbox full, {} rejected", command);
            HubPushError::Full
        })
    }

    /// Accept a raw wire value from the hub link.
    pub fn push_wire_value(&mut self, value: u8) -> Result<(), HubPushError> {
        let command = Command::from_wire_value(value).ok_or(HubPushError::NoCommand)?;
        self.push(command)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl CommandSource for HubInbox {
    fn poll_command(&mut self) -> Option<Command> {
        self.queue.pop_front()
    }
}
