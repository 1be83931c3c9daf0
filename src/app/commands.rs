//! Inbound command provenance.
//!
//! Every command the [`DeliveryController`](super::controller::DeliveryController)
//! delivers is tagged with where it came from, so log events and cooldown
//! rules can tell sources apart.

use serde::{Deserialize, Serialize};

use crate::ir::command::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandOrigin {
    /// Pushed by the smart-home hub (or another external controller).
    Hub,
    /// Fired by the [`CommandScheduler`](crate::scheduler::CommandScheduler).
    Schedule,
    /// Produced by the hysteresis heat-demand check.
    Thermostat,
    /// Started directly through `send_immediate`.
    Direct,
}

impl CommandOrigin {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Hub => "HUB",
            Self::Schedule => "SCHEDULE",
            Self::Thermostat => "THERMOSTAT",
            Self::Direct => "DIRECT",
        }
    }

    /// Whether commands from this origin change the local power flag and
    /// target temperature when accepted.
    pub const fn updates_local_state(self) -> bool {
        matches!(self, Self::Hub | Self::Schedule | Self::Direct)
    }
}

/// A command together with its origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourcedCommand {
    pub command: Command,
    pub origin: CommandOrigin,
}
