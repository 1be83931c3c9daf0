//! Fuzz target: `SignalCapture` edge handling
//!
//! Drives arbitrary edge spacings (including counter wrap) through the
//! capture buffer and asserts frames stay within bounds.
//!
//! cargo fuzz run fuzz_capture_edges

#![no_main]

use libfuzzer_sys::fuzz_target;
use retrofit::ir::capture::SignalCapture;
use retrofit::ir::timing::MAX_PULSES;

fuzz_target!(|data: &[u8]| {
    let capture = SignalCapture::new();
    let mut t = 0u32;

    for chunk in data.chunks_exact(4) {
        t = t.wrapping_add(u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
        capture.on_edge(t);
        assert!(capture.pending_pulses() <= MAX_PULSES);

        if let Some(frame) = capture.poll_raw_frame() {
            assert!(frame.len() <= MAX_PULSES);
        }
    }

    capture.close_idle_frame(t.wrapping_add(1_000_000));
    assert_eq!(capture.pending_pulses(), 0);
});
