//! Port traits: the boundary between the delivery logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ DeliveryController (domain)
//! ```
//!
//! The controller consumes these through generics, so host tests swap in
//! recording doubles without touching the state machine.

use super::events::{BridgeEvent, EventStamp};
use crate::error::TxFailure;
use crate::ir::capture::RawFrame;
use crate::ir::codec::DecodedFrame;
use crate::ir::command::Command;

// ───────────────────────────────────────────────────────────────
// IR transmit port (domain → IR LED)
// ───────────────────────────────────────────────────────────────

/// Anything that can put a heater frame on the air.
///
/// Failures are returned, never panicked, and are cheap to retry.
pub trait IrTransmit {
    fn send_command(&mut self, command: Command) -> Result<(), TxFailure>;

    fn send_ack(&mut self, command: Command) -> Result<(), TxFailure>;

    /// Replay a previously captured frame verbatim.
    fn send_raw(&mut self, frame: &RawFrame) -> Result<(), TxFailure>;
}

// ───────────────────────────────────────────────────────────────
// Frame source port (IR receiver → domain)
// ───────────────────────────────────────────────────────────────

/// Completed frames from the IR receiver.
pub trait FrameSource {
    /// Next frame that decoded cleanly and is addressed to us.
    fn poll_frame(&mut self, now_us: u32) -> Option<DecodedFrame>;

    /// Next completed frame, undecoded (learning mode).
    fn poll_raw_frame(&mut self, now_us: u32) -> Option<RawFrame>;
}

// ───────────────────────────────────────────────────────────────
// Command source port (hub / external controllers → domain)
// ───────────────────────────────────────────────────────────────

/// A pollable queue of externally requested commands.
pub trait CommandSource {
    fn poll_command(&mut self) -> Option<Command>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging / analytics)
// ───────────────────────────────────────────────────────────────

/// Receives one structured event per source arrival, transmit attempt,
/// ack, drop and state transition.
pub trait EventSink {
    fn emit(&mut self, stamp: &EventStamp, event: &BridgeEvent);
}

/// Fan-out to two sinks.
impl<A: EventSink, B: EventSink> EventSink for (A, B) {
    fn emit(&mut self, stamp: &EventStamp, event: &BridgeEvent) {
        self.0.emit(stamp, event);
        self.1.emit(stamp, event);
    }
}
