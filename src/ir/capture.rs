//! Interrupt-driven pulse capture for the IR receiver.
//!
//! ## Execution contexts
//!
//! [`SignalCapture::on_edge`] runs in the GPIO interrupt on every level
//! change of the receiver output. Everything else runs in the main loop.
//! The two meet only inside `critical_section::with`, and each critical
//! section is bounded to a fixed-size copy: the ISR never waits on the
//! main loop and the main loop never sees a half-written frame.
//!
//! ## Frame boundaries
//!
//! | inter-edge delta            | effect                                   |
//! |-----------------------------|------------------------------------------|
//! | > `FRAME_GAP_US`            | close current frame (if > 8 pulses)      |
//! | < `MIN_PULSE_US`            | noise, ignored                           |
//! | otherwise                   | appended; dropped once 128 are held      |
//!
//! The last frame of a burst has no following edge, so the main loop closes
//! it from [`SignalCapture::close_idle_frame`] once the line has been quiet
//! for a frame gap.

use core::cell::RefCell;

use critical_section::Mutex;

use super::codec::{DecodedFrame, ProtocolCodec};
use super::timing::{FRAME_GAP_US, MAX_PULSES, MIN_PULSE_US};
use crate::app::ports::FrameSource;

/// Fewer pulses than this are not worth handing to a consumer.
const MIN_COMPLETED_PULSES: usize = 9;

/// A captured sequence of inter-edge durations, copied out by value.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RawFrame {
    pulses: [u16; MAX_PULSES],
    len: usize,
}

impl RawFrame {
    pub const fn empty() -> Self {
        Self {
            pulses: [0; MAX_PULSES],
            len: 0,
        }
    }

    /// Copy up to [`MAX_PULSES`] durations; the rest are dropped.
    pub fn from_slice(pulses: &[u16]) -> Self {
        let mut frame = Self::empty();
        for &p in pulses.iter().take(MAX_PULSES) {
            frame.push(p);
        }
        frame
    }

    pub fn as_slice(&self) -> &[u16] {
        &self.pulses[..self.len]
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns `false` once the frame is full.
    fn push(&mut self, duration_us: u16) -> bool {
        if self.len >= MAX_PULSES {
            return false;
        }
        self.pulses[self.len] = duration_us;
        self.len += 1;
        true
    }

    fn clear(&mut self) {
        self.len = 0;
    }
}

impl Default for RawFrame {
    fn default() -> Self {
        Self::empty()
    }
}

impl core::fmt::Debug for RawFrame {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RawFrame").field("pulses", &self.as_slice()).finish()
    }
}

/// Counters for diagnostics. Read with [`SignalCapture::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
    /// Edges closer together than the minimum pulse.
    pub noise_edges: u32,
    /// Pulses dropped because the frame was already full.
    pub overflow_pulses: u32,
    /// Completed frames replaced before the main loop collected them.
    pub overwritten_frames: u32,
}

struct CaptureState {
    current: RawFrame,
    completed: Option<RawFrame>,
    last_edge_us: Option<u32>,
    stats: CaptureStats,
}

impl CaptureState {
    const fn new() -> Self {
        Self {
            current: RawFrame::empty(),
            completed: None,
            last_edge_us: None,
            stats: CaptureStats {
                noise_edges: 0,
                overflow_pulses: 0,
                overwritten_frames: 0,
            },
        }
    }

    fn on_edge(&mut self, now_us: u32) {
        let Some(last) = self.last_edge_us.replace(now_us) else {
            return;
        };
        let delta = now_us.wrapping_sub(last);

        if delta > FRAME_GAP_US {
            self.complete_current();
            return;
        }
        if delta < MIN_PULSE_US {
            self.stats.noise_edges = self.stats.noise_edges.wrapping_add(1);
            return;
        }
        if !self.current.push(delta as u16) {
            self.stats.overflow_pulses = self.stats.overflow_pulses.wrapping_add(1);
        }
    }

    fn complete_current(&mut self) {
        if self.current.len() >= MIN_COMPLETED_PULSES {
            if self.completed.is_some() {
                self.stats.overwritten_frames = self.stats.overwritten_frames.wrapping_add(1);
            }
            self.completed = Some(self.current);
        }
        self.current.clear();
    }

    fn idle_for_frame_gap(&self, now_us: u32) -> bool {
        self.last_edge_us
            .is_some_and(|last| (now_us.wrapping_sub(last) as i32) > FRAME_GAP_US as i32)
    }
}

/// Pulse capture shared between the receiver ISR and the main loop.
///
/// `const`-constructible so the firmware can place it in a `static` and
/// hand the ISR a `&'static` reference at registration time.
pub struct SignalCapture {
    state: Mutex<RefCell<CaptureState>>,
}

impl SignalCapture {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(CaptureState::new())),
        }
    }

    /// ISR entry point: one call per receiver level change.
    ///
    /// Never blocks, allocates or logs.
    pub fn on_edge(&self, now_us: u32) {
        critical_section::with(|cs| self.state.borrow_ref_mut(cs).on_edge(now_us));
    }

    /// Close the in-progress frame if no edge has arrived for a frame gap.
    pub fn close_idle_frame(&self, now_us: u32) {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            if state.idle_for_frame_gap(now_us) {
                state.complete_current();
            }
        });
    }

    /// Take the completed frame, if any. Snapshot and clear are one
    /// critical section.
    pub fn poll_raw_frame(&self) -> Option<RawFrame> {
        critical_section::with(|cs| self.state.borrow_ref_mut(cs).completed.take())
    }

    /// Close an idle frame, take it and decode it. Frames that fail to
    /// decode are discarded.
    pub fn poll(&self, now_us: u32, codec: &ProtocolCodec) -> Option<DecodedFrame> {
        self.close_idle_frame(now_us);
        let frame = self.poll_raw_frame()?;
        codec.decode_pulses(frame.as_slice()).ok()
    }

    /// Drop everything captured so far.
    pub fn reset(&self) {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            state.current.clear();
            state.completed = None;
        });
    }

    pub fn stats(&self) -> CaptureStats {
        critical_section::with(|cs| self.state.borrow_ref(cs).stats)
    }

    /// Pulses held by the in-progress frame.
    pub fn pending_pulses(&self) -> usize {
        critical_section::with(|cs| self.state.borrow_ref(cs).current.len())
    }
}

impl Default for SignalCapture {
    fn default() -> Self {
        Self::new()
    }
}

/// [`FrameSource`] over a shared capture buffer.
pub struct IrReceiver<'a> {
    capture: &'a SignalCapture,
    codec: ProtocolCodec,
}

impl<'a> IrReceiver<'a> {
    pub const fn new(capture: &'a SignalCapture, codec: ProtocolCodec) -> Self {
        Self { capture, codec }
    }
}

impl FrameSource for IrReceiver<'_> {
    fn poll_frame(&mut self, now_us: u32) -> Option<DecodedFrame> {
        self.capture.poll(now_us, &self.codec)
    }

    fn poll_raw_frame(&mut self, now_us: u32) -> Option<RawFrame> {
        self.capture.close_idle_frame(now_us);
        self.capture.poll_raw_frame()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::codec::DeviceAddress;
    use crate::ir::command::{Command, FrameKind};

    /// Replay durations as edges starting at `t0`; returns the last edge time.
    fn feed(capture: &SignalCapture, t0: u32, durations: &[u16]) -> u32 {
        let mut t = t0;
        capture.on_edge(t);
        for &d in durations {
            t = t.wrapping_add(u32::from(d));
            capture.on_edge(t);
        }
        t
    }

    fn frame_durations(command: Command, kind: FrameKind) -> Vec<u16> {
        let codec = ProtocolCodec::new(DeviceAddress(0xBF40));
        let packet = codec.encode(command, kind).unwrap();
        let mut d: Vec<u16> = packet.to_pulses().iter().map(|p| p.duration_us).collect();
        // The closing space is line idle, not an edge.
        d.pop();
        d
    }

    #[test]
    fn gap_completes_previous_frame() {
        let capture = SignalCapture::new();
        let d = frame_durations(Command::On, FrameKind::Ack);
        let end = feed(&capture, 1_000, &d);
        assert!(capture.poll_raw_frame().is_none(), "frame still open");

        capture.on_edge(end + 20_000);
        let frame = capture.poll_raw_frame().expect("completed frame");
        assert_eq!(frame.as_slice(), d.as_slice());
        assert!(capture.poll_raw_frame().is_none(), "snapshot clears");
    }

    #[test]
    fn idle_line_closes_last_frame() {
        let capture = SignalCapture::new();
        let codec = ProtocolCodec::new(DeviceAddress(0xBF40));
        let end = feed(&capture, 50_000, &frame_durations(Command::TempUp, FrameKind::Command));

        assert_eq!(capture.poll(end + 10_000, &codec), None);
        let frame = capture.poll(end + 15_000, &codec).expect("decoded");
        assert_eq!(frame.command, Command::TempUp);
        assert!(!frame.is_ack());
    }

    #[test]
    fn noise_edges_are_ignored() {
        let capture = SignalCapture::new();
        capture.on_edge(0);
        capture.on_edge(500);
        capture.on_edge(540);
        assert_eq!(capture.pending_pulses(), 1);
        assert_eq!(capture.stats().noise_edges, 1);
    }

    #[test]
    fn short_bursts_are_not_frames() {
        let capture = SignalCapture::new();
        let end = feed(&capture, 0, &[600; 8]);
        capture.on_edge(end + 30_000);
        assert!(capture.poll_raw_frame().is_none());
    }

    #[test]
    fn overflow_drops_extra_pulses() {
        let capture = SignalCapture::new();
        let end = feed(&capture, 0, &[700; 200]);
        assert_eq!(capture.pending_pulses(), MAX_PULSES);
        assert_eq!(capture.stats().overflow_pulses, 72);
        capture.on_edge(end + 20_000);
        assert_eq!(capture.poll_raw_frame().map(|f| f.len()), Some(MAX_PULSES));
    }

    #[test]
    fn edges_across_timer_wrap() {
        let capture = SignalCapture::new();
        let codec = ProtocolCodec::new(DeviceAddress(0xBF40));
        let end = feed(&capture, u32::MAX - 20_000, &frame_durations(Command::Off, FrameKind::Ack));
        let frame = capture.poll(end.wrapping_add(20_000), &codec).expect("decoded");
        assert_eq!(frame.command, Command::Off);
        assert!(frame.is_ack());
    }

    #[test]
    fn undecodable_frame_is_discarded() {
        let capture = SignalCapture::new();
        let codec = ProtocolCodec::new(DeviceAddress(0x1111));
        let end = feed(&capture, 0, &frame_durations(Command::On, FrameKind::Command));
        assert_eq!(capture.poll(end + 20_000, &codec), None);
        assert!(capture.poll_raw_frame().is_none());
    }

    #[test]
    fn receiver_drains_through_frame_source() {
        let capture = SignalCapture::new();
        let mut rx = IrReceiver::new(&capture, ProtocolCodec::new(DeviceAddress(0xBF40)));
        let end = feed(&capture, 0, &frame_durations(Command::On, FrameKind::Command));
        assert_eq!(rx.poll_frame(end + 1_000), None);
        let raw = rx.poll_raw_frame(end + 20_000).expect("raw frame");
        assert_eq!(raw.len(), 67);
        assert_eq!(rx.poll_frame(end + 40_000), None);
    }
}
