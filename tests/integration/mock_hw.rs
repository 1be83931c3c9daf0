//! Simulated IR link for integration tests.
//!
//! Each direction of the link is an [`Air`] queue of pulse trains. A
//! transmitter built on [`AirCarrier`] pushes into it; [`Loopback::step`]
//! replays at most one queued frame per direction as receiver edges into
//! the far end's `SignalCapture`, exactly as the GPIO ISR would.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use retrofit::adapters::event_log::EventLog;
use retrofit::adapters::hub::HubInbox;
use retrofit::app::controller::{DeliveryController, TickInput};
use retrofit::app::events::{BridgeEvent, EventStamp};
use retrofit::app::ports::EventSink;
use retrofit::app::responder::{AckResponder, HeaterState};
use retrofit::clock::WallClockSnapshot;
use retrofit::config::BridgeConfig;
use retrofit::ir::capture::{IrReceiver, SignalCapture};
use retrofit::ir::codec::ProtocolCodec;
use retrofit::ir::timing::{FRAME_GAP_US, Level, Pulse};
use retrofit::ir::transmitter::{CarrierOutput, Transmitter};

pub type Air = Rc<RefCell<VecDeque<Vec<Pulse>>>>;

// ── Carrier that transmits into the air ───────────────────────

pub struct AirCarrier {
    air: Air,
}

impl AirCarrier {
    pub fn new(air: &Air) -> Self {
        Self { air: Rc::clone(air) }
    }
}

impl CarrierOutput for AirCarrier {
    fn is_available(&self) -> bool {
        true
    }

    fn emit(&mut self, pulses: &[Pulse]) {
        self.air.borrow_mut().push_back(pulses.to_vec());
    }
}

pub type AirTransmitter = Transmitter<AirCarrier>;

pub fn air_transmitter(air: &Air, config: &BridgeConfig) -> AirTransmitter {
    let mut tx = Transmitter::new(AirCarrier::new(air), ProtocolCodec::new(config.address()), config.carrier());
    tx.begin().expect("air carrier is always available");
    tx
}

/// Replay a pulse train as receiver edges starting at `t0_us`, then let
/// the line go idle long enough to close the frame. Returns the time
/// after the idle gap.
pub fn replay(capture: &SignalCapture, t0_us: u32, pulses: &[Pulse]) -> u32 {
    let mut t = t0_us;
    capture.on_edge(t);
    // A trailing space is line idle, not an edge.
    let edges = match pulses.last() {
        Some(p) if p.level == Level::Space => pulses.len() - 1,
        _ => pulses.len(),
    };
    for p in &pulses[..edges] {
        t = t.wrapping_add(u32::from(p.duration_us));
        capture.on_edge(t);
    }
    let idle = t.wrapping_add(FRAME_GAP_US + 1_000);
    capture.close_idle_frame(idle);
    idle
}

// ── Event collector ───────────────────────────────────────────

#[derive(Default)]
pub struct CollectingSink {
    pub events: Vec<(EventStamp, BridgeEvent)>,
}

#[allow(dead_code)]
impl CollectingSink {
    pub fn count(&self, pred: impl Fn(&BridgeEvent) -> bool) -> usize {
        self.events.iter().filter(|(_, e)| pred(e)).count()
    }
}

impl EventSink for CollectingSink {
    fn emit(&mut self, stamp: &EventStamp, event: &BridgeEvent) {
        self.events.push((*stamp, *event));
    }
}

// ── Bridge ⇄ heater loopback ──────────────────────────────────

pub struct Loopback {
    pub bridge: DeliveryController<AirTransmitter>,
    pub heater: AckResponder<AirTransmitter>,
    pub hub: HubInbox,
    pub log: EventLog,
    pub heater_events: CollectingSink,
    pub bridge_capture: &'static SignalCapture,
    pub heater_capture: &'static SignalCapture,
    pub to_heater: Air,
    pub to_bridge: Air,
    /// Frames to lose on the way to the heater / bridge.
    pub lose_to_heater: usize,
    pub lose_to_bridge: usize,
    pub now_ms: u32,
    pub wall: WallClockSnapshot,
    codec: ProtocolCodec,
    air_clock_us: u32,
}

#[allow(dead_code)]
impl Loopback {
    pub fn new(config: &BridgeConfig) -> Self {
        let to_heater: Air = Rc::default();
        let to_bridge: Air = Rc::default();
        Self {
            bridge: DeliveryController::new(air_transmitter(&to_heater, config), config),
            heater: AckResponder::new(
                air_transmitter(&to_bridge, config),
                HeaterState::new(config.default_target_temperature_c),
            ),
            hub: HubInbox::new(),
            log: EventLog::new(),
            heater_events: CollectingSink::default(),
            bridge_capture: Box::leak(Box::new(SignalCapture::new())),
            heater_capture: Box::leak(Box::new(SignalCapture::new())),
            to_heater,
            to_bridge,
            lose_to_heater: 0,
            lose_to_bridge: 0,
            now_ms: 0,
            wall: WallClockSnapshot::invalid(),
            codec: ProtocolCodec::new(config.address()),
            air_clock_us: 1_000,
        }
    }

    fn carry(&mut self, to_heater: bool) {
        let (air, capture, lose) = if to_heater {
            (&self.to_heater, self.heater_capture, &mut self.lose_to_heater)
        } else {
            (&self.to_bridge, self.bridge_capture, &mut self.lose_to_bridge)
        };
        let Some(frame) = air.borrow_mut().pop_front() else {
            return;
        };
        if *lose > 0 {
            *lose -= 1;
            return;
        }
        self.air_clock_us = replay(capture, self.air_clock_us, &frame);
    }

    /// Advance `ms`, move one frame each way and run both ends once.
    pub fn step(&mut self, ms: u32, room_c: Option<f32>) {
        self.now_ms = self.now_ms.wrapping_add(ms);
        let now_us = self.now_ms.wrapping_mul(1000);
        let stamp = EventStamp::new(self.now_ms, &self.wall);

        self.carry(true);
        let mut heater_rx = IrReceiver::new(self.heater_capture, self.codec);
        self.heater.poll(now_us, &stamp, &mut heater_rx, &mut self.heater_events);

        self.carry(false);
        let mut bridge_rx = IrReceiver::new(self.bridge_capture, self.codec);
        let input = TickInput {
            now_ms: self.now_ms,
            now_us,
            wall: self.wall,
            room_temperature_c: room_c,
        };
        self.bridge.tick(&input, &mut self.hub, &mut bridge_rx, &mut self.log);
    }

    pub fn run(&mut self, steps: usize, ms: u32, room_c: Option<f32>) {
        for _ in 0..steps {
            self.step(ms, room_c);
        }
    }

    /// Put a frame on the air towards the bridge, as the original remote would.
    pub fn remote_press(&mut self, pulses: Vec<Pulse>) {
        self.to_bridge.borrow_mut().push_back(pulses);
    }
}
