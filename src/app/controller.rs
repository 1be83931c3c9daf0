//! Delivery controller: the acknowledged, retried command path.
//!
//! [`DeliveryController`] owns the transmitter, the scheduler and the local
//! thermostat state. Hub commands, received frames and events flow through
//! port traits passed in at each call, so the whole state machine runs on
//! the host with recording doubles.
//!
//! ```text
//!                   ack for pending
//!        ┌──────┐ ◀───────────────── ┌─────────────┐
//!        │ IDLE │                    │ WAITING_ACK │ ──┐ timeout,
//!        └──────┘ ─────────────────▶ └─────────────┘ ◀─┘ retries left
//!           ▲        command sent           │
//!           └───────────────────────────────┘
//!              retries exhausted: drop + cooldown
//! ```

use log::{info, warn};

use crate::clock::{WallClockSnapshot, deadline_reached};
use crate::config::BridgeConfig;
use crate::control::hysteresis::HeatDemand;
use crate::error::TxFailure;
use crate::ir::codec::DecodedFrame;
use crate::ir::command::Command;
use crate::ir::learning::{LearnedCommands, LearningOutcome, LearningSession};
use crate::scheduler::CommandScheduler;

use super::commands::{CommandOrigin, SourcedCommand};
use super::events::{BridgeEvent, DeliveryState, EventStamp};
use super::ports::{CommandSource, EventSink, FrameSource, IrTransmit};

/// Everything the controller needs to know about "now" for one tick.
#[derive(Debug, Clone, Copy)]
pub struct TickInput {
    pub now_ms: u32,
    pub now_us: u32,
    pub wall: WallClockSnapshot,
    /// `None` while the room sensor has no reading; the thermostat check
    /// is skipped.
    pub room_temperature_c: Option<f32>,
}

impl TickInput {
    pub fn stamp(&self) -> EventStamp {
        EventStamp::new(self.now_ms, &self.wall)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingDelivery {
    command: Command,
    origin: CommandOrigin,
    deadline_ms: u32,
    retry_count: u8,
}

impl PendingDelivery {
    /// Transmissions so far, including the first.
    fn attempts(&self) -> u8 {
        self.retry_count.saturating_add(1)
    }
}

/// Point-in-time view for status reporting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeliveryHealth {
    pub power_enabled: bool,
    pub heater_commanded_on: bool,
    pub target_temperature_c: f32,
    pub last_tx_failure: Option<TxFailure>,
    pub pending: Option<Command>,
    pub retry_count: u8,
    pub cooling_down: bool,
}

/// Lifetime delivery counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    pub sent: u32,
    pub retried: u32,
    pub acked: u32,
    pub dropped: u32,
    pub transmit_failures: u32,
}

pub struct DeliveryController<T> {
    tx: T,
    scheduler: CommandScheduler,
    learned: LearnedCommands,
    learning: Option<LearningSession>,
    demand: HeatDemand,

    ack_timeout_ms: u32,
    max_retries: u8,
    drop_cooldown_ms: u32,
    learning_timeout_ms: u32,

    pending: Option<PendingDelivery>,
    cooldown_until_ms: Option<u32>,
    power_enabled: bool,
    heater_commanded_on: bool,
    target_temperature_c: f32,
    last_tx_failure: Option<TxFailure>,
    stats: DeliveryStats,
}

impl<T: IrTransmit> DeliveryController<T> {
    pub fn new(tx: T, config: &BridgeConfig) -> Self {
        let mut scheduler = CommandScheduler::new();
        scheduler.set_enabled(config.scheduler_enabled);
        Self {
            tx,
            scheduler,
            learned: LearnedCommands::new(),
            learning: None,
            demand: HeatDemand::new(config.hysteresis_c),
            ack_timeout_ms: config.ack_timeout_ms,
            max_retries: config.max_retries,
            drop_cooldown_ms: config.drop_cooldown_ms,
            learning_timeout_ms: config.learning_timeout_ms,
            pending: None,
            cooldown_until_ms: None,
            power_enabled: false,
            heater_commanded_on: false,
            target_temperature_c: config.default_target_temperature_c,
            last_tx_failure: None,
            stats: DeliveryStats::default(),
        }
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// One pass of the delivery loop: frames → ack timeout → one new
    /// command from the hub or the scheduler → thermostat check.
    ///
    /// While a learning session is active the tick does nothing else.
    pub fn tick(
        &mut self,
        input: &TickInput,
        hub: &mut impl CommandSource,
        frames: &mut impl FrameSource,
        sink: &mut impl EventSink,
    ) {
        let stamp = input.stamp();

        if self.learning.is_some() {
            self.tick_learning(input, &stamp, frames, sink);
            return;
        }

        // 1. Received frames
        while let Some(frame) = frames.poll_frame(input.now_us) {
            self.handle_frame(frame, &stamp, sink);
        }

        // 2. Ack timeout
        self.check_ack_timeout(input.now_ms, &stamp, sink);

        if let Some(until) = self.cooldown_until_ms {
            if deadline_reached(until, input.now_ms) {
                self.cooldown_until_ms = None;
            }
        }

        // 3. One new command, hub before scheduler
        if self.pending.is_none() {
            if let Some(sourced) = self.next_sourced_command(input, hub) {
                self.begin_delivery(sourced, &stamp, sink);
            }
        }

        // 4. Thermostat
        if self.pending.is_none() && self.cooldown_until_ms.is_none() {
            if let Some(room_c) = input.room_temperature_c {
                self.run_thermostat(room_c, &stamp, sink);
            }
        }
    }

    /// Start a delivery outside the tick arbitration. Refused while a
    /// delivery or a learning session is in progress.
    pub fn send_immediate(
        &mut self,
        command: Command,
        origin: CommandOrigin,
        stamp: &EventStamp,
        sink: &mut impl EventSink,
    ) -> bool {
        if command == Command::None || self.pending.is_some() || self.learning.is_some() {
            return false;
        }
        self.begin_delivery(SourcedCommand { command, origin }, stamp, sink);
        true
    }

    // ── Learning ──────────────────────────────────────────────

    /// Capture the next frame seen by the receiver as `command`'s raw
    /// frame. Only possible while IDLE.
    pub fn start_learning(&mut self, command: Command, stamp: &EventStamp, sink: &mut impl EventSink) -> bool {
        if self.pending.is_some() || self.learning.is_some() {
            return false;
        }
        let Some(session) = LearningSession::start(command, stamp.uptime_ms, self.learning_timeout_ms) else {
            return false;
        };
        self.learning = Some(session);
        info!("Learning {}: waiting up to {} ms for a frame", command, self.learning_timeout_ms);
        sink.emit(stamp, &BridgeEvent::LearningStarted { command });
        true
    }

    pub fn cancel_learning(&mut self) {
        self.learning = None;
    }

    pub fn is_learning(&self) -> bool {
        self.learning.is_some()
    }

    fn tick_learning(
        &mut self,
        input: &TickInput,
        stamp: &EventStamp,
        frames: &mut impl FrameSource,
        sink: &mut impl EventSink,
    ) {
        let Some(session) = self.learning else {
            return;
        };
        let command = session.command();
        match session.poll(input.now_ms, frames.poll_raw_frame(input.now_us)) {
            LearningOutcome::Waiting => {}
            LearningOutcome::Learned(frame) => {
                self.learning = None;
                self.learned.store(command, frame);
                info!("Learning {}: captured {} pulses", command, frame.len());
                sink.emit(
                    stamp,
                    &BridgeEvent::LearningSucceeded {
                        command,
                        pulses: frame.len().min(usize::from(u8::MAX)) as u8,
                    },
                );
            }
            LearningOutcome::TimedOut => {
                self.learning = None;
                warn!("Learning {}: timed out", command);
                sink.emit(stamp, &BridgeEvent::LearningTimedOut { command });
            }
        }
    }

    // ── Delivery state machine ────────────────────────────────

    fn handle_frame(&mut self, frame: DecodedFrame, stamp: &EventStamp, sink: &mut impl EventSink) {
        sink.emit(stamp, &BridgeEvent::FrameReceived(frame));
        if !frame.is_ack() {
            return;
        }

        match self.pending {
            Some(pending) if pending.command == frame.command => {
                self.pending = None;
                self.stats.acked = self.stats.acked.wrapping_add(1);
                match frame.command {
                    Command::On => self.heater_commanded_on = true,
                    Command::Off => self.heater_commanded_on = false,
                    _ => {}
                }
                info!("ACK {} after {} attempt(s)", frame.command, pending.attempts());
                sink.emit(
                    stamp,
                    &BridgeEvent::AckReceived {
                        command: frame.command,
                        attempts: pending.attempts(),
                    },
                );
                emit_state_change(DeliveryState::WaitingAck, DeliveryState::Idle, stamp, sink);
            }
            _ => sink.emit(stamp, &BridgeEvent::AckIgnored { command: frame.command }),
        }
    }

    fn check_ack_timeout(&mut self, now_ms: u32, stamp: &EventStamp, sink: &mut impl EventSink) {
        let Some(pending) = self.pending else {
            return;
        };
        if !deadline_reached(pending.deadline_ms, now_ms) {
            return;
        }

        if pending.retry_count < self.max_retries {
            let attempt = pending.attempts();
            self.stats.retried = self.stats.retried.wrapping_add(1);
            warn!("No ACK for {}, retry {}/{}", pending.command, attempt, self.max_retries);
            self.transmit(pending.command, attempt, stamp, sink);
            self.pending = Some(PendingDelivery {
                retry_count: attempt,
                deadline_ms: now_ms.wrapping_add(self.ack_timeout_ms),
                ..pending
            });
            return;
        }

        self.pending = None;
        self.cooldown_until_ms = Some(now_ms.wrapping_add(self.drop_cooldown_ms));
        self.stats.dropped = self.stats.dropped.wrapping_add(1);
        warn!(
            "Dropping {} from {} after {} attempt(s); thermostat paused {} ms",
            pending.command,
            pending.origin.label(),
            pending.attempts(),
            self.drop_cooldown_ms
        );
        sink.emit(
            stamp,
            &BridgeEvent::CommandDropped {
                command: pending.command,
                attempts: pending.attempts(),
            },
        );
        emit_state_change(DeliveryState::WaitingAck, DeliveryState::Idle, stamp, sink);
    }

    fn next_sourced_command(&mut self, input: &TickInput, hub: &mut impl CommandSource) -> Option<SourcedCommand> {
        if let Some(command) = hub.poll_command().filter(|c| *c != Command::None) {
            return Some(SourcedCommand { command, origin: CommandOrigin::Hub });
        }
        self.scheduler
            .next_due_command(input.now_ms, &input.wall)
            .map(|command| SourcedCommand { command, origin: CommandOrigin::Schedule })
    }

    fn begin_delivery(&mut self, sourced: SourcedCommand, stamp: &EventStamp, sink: &mut impl EventSink) {
        let SourcedCommand { command, origin } = sourced;
        info!("{} command {}", origin.label(), command);
        sink.emit(stamp, &BridgeEvent::CommandAccepted { origin, command });

        if origin.updates_local_state() {
            self.apply_local_state(command);
            sink.emit(
                stamp,
                &BridgeEvent::ThermostatUpdated {
                    power_enabled: self.power_enabled,
                    target_temperature_c: self.target_temperature_c,
                },
            );
        }

        self.transmit(command, 0, stamp, sink);
        self.pending = Some(PendingDelivery {
            command,
            origin,
            deadline_ms: stamp.uptime_ms.wrapping_add(self.ack_timeout_ms),
            retry_count: 0,
        });
        emit_state_change(DeliveryState::Idle, DeliveryState::WaitingAck, stamp, sink);
    }

    fn apply_local_state(&mut self, command: Command) {
        match command {
            Command::On => self.power_enabled = true,
            Command::Off => self.power_enabled = false,
            Command::TempUp => self.target_temperature_c += 1.0,
            Command::TempDown => self.target_temperature_c -= 1.0,
            Command::None => {}
        }
    }

    /// One transmission attempt. A failure is reported and still counts
    /// as an attempt; the ack timeout drives what happens next.
    fn transmit(&mut self, command: Command, attempt: u8, stamp: &EventStamp, sink: &mut impl EventSink) {
        let result = match self.learned.get(command) {
            Some(frame) => self.tx.send_raw(frame),
            None => self.tx.send_command(command),
        };

        match result {
            Ok(()) => {
                self.last_tx_failure = None;
                self.stats.sent = self.stats.sent.wrapping_add(1);
                sink.emit(stamp, &BridgeEvent::CommandSent { command, attempt });
            }
            Err(failure) => {
                self.last_tx_failure = Some(failure);
                self.stats.transmit_failures = self.stats.transmit_failures.wrapping_add(1);
                warn!("IR transmit of {} failed: {} (code {})", command, failure, failure.code());
                sink.emit(stamp, &BridgeEvent::TransmitFailed { command, failure });
            }
        }
    }

    fn run_thermostat(&mut self, room_c: f32, stamp: &EventStamp, sink: &mut impl EventSink) {
        let heat = self.demand.should_heat(
            self.power_enabled,
            self.heater_commanded_on,
            self.target_temperature_c,
            room_c,
        );
        if heat == self.heater_commanded_on {
            return;
        }
        let command = if heat { Command::On } else { Command::Off };
        self.begin_delivery(
            SourcedCommand {
                command,
                origin: CommandOrigin::Thermostat,
            },
            stamp,
            sink,
        );
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> DeliveryState {
        if self.pending.is_some() {
            DeliveryState::WaitingAck
        } else {
            DeliveryState::Idle
        }
    }

    pub fn health(&self) -> DeliveryHealth {
        DeliveryHealth {
            power_enabled: self.power_enabled,
            heater_commanded_on: self.heater_commanded_on,
            target_temperature_c: self.target_temperature_c,
            last_tx_failure: self.last_tx_failure,
            pending: self.pending.map(|p| p.command),
            retry_count: self.pending.map_or(0, |p| p.retry_count),
            cooling_down: self.cooldown_until_ms.is_some(),
        }
    }

    pub fn stats(&self) -> DeliveryStats {
        self.stats
    }

    pub fn scheduler(&self) -> &CommandScheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut CommandScheduler {
        &mut self.scheduler
    }

    pub fn learned(&self) -> &LearnedCommands {
        &self.learned
    }

    pub fn learned_mut(&mut self) -> &mut LearnedCommands {
        &mut self.learned
    }

    pub fn transmitter(&self) -> &T {
        &self.tx
    }

    pub fn transmitter_mut(&mut self) -> &mut T {
        &mut self.tx
    }
}

fn emit_state_change(from: DeliveryState, to: DeliveryState, stamp: &EventStamp, sink: &mut impl EventSink) {
    sink.emit(stamp, &BridgeEvent::StateChanged { from, to });
}
