//! Learning mode: capture the original remote's frame for a command and
//! replay it verbatim instead of the encoded packet.

use super::capture::RawFrame;
use super::command::Command;
use crate::clock::deadline_reached;

/// One learned frame per transmittable command. RAM only.
#[derive(Debug, Clone, Default)]
pub struct LearnedCommands {
    slots: [Option<RawFrame>; Command::ALL.len()],
}

impl LearnedCommands {
    pub const fn new() -> Self {
        Self { slots: [None; Command::ALL.len()] }
    }

    fn slot(command: Command) -> Option<usize> {
        match command {
            Command::None => None,
            other => Some(other.wire_value() as usize - 1),
        }
    }

    pub fn get(&self, command: Command) -> Option<&RawFrame> {
        Self::slot(command).and_then(|i| self.slots[i].as_ref())
    }

    /// Returns `false` for `Command::None` or an empty frame.
    pub fn store(&mut self, command: Command, frame: RawFrame) -> bool {
        match Self::slot(command) {
            Some(i) if !frame.is_empty() => {
                self.slots[i] = Some(frame);
                true
            }
            _ => false,
        }
    }

    pub fn forget(&mut self, command: Command) {
        if let Some(i) = Self::slot(command) {
            self.slots[i] = None;
        }
    }

    pub fn count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearningOutcome {
    Waiting,
    Learned(RawFrame),
    TimedOut,
}

/// A single learning attempt for one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LearningSession {
    command: Command,
    deadline_ms: u32,
}

impl LearningSession {
    /// `None` when asked to learn `Command::None`.
    pub fn start(command: Command, now_ms: u32, timeout_ms: u32) -> Option<Self> {
        if command == Command::None {
            return None;
        }
        Some(Self {
            command,
            deadline_ms: now_ms.wrapping_add(timeout_ms),
        })
    }

    pub fn command(&self) -> Command {
        self.command
    }

    /// A frame arriving in the same poll as the deadline still counts.
    pub fn poll(&self, now_ms: u32, frame: Option<RawFrame>) -> LearningOutcome {
        match frame {
            Some(frame) if !frame.is_empty() => LearningOutcome::Learned(frame),
            _ if deadline_reached(self.deadline_ms, now_ms) => LearningOutcome::TimedOut,
            _ => LearningOutcome::Waiting,
        }
    }
}
