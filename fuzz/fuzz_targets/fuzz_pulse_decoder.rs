//! Fuzz target: `ProtocolCodec::decode_pulses`
//!
//! Reinterprets arbitrary bytes as captured inter-edge durations and
//! asserts the decoder never panics and only ever reports frames that
//! re-encode to the same command.
//!
//! cargo fuzz run fuzz_pulse_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use retrofit::ir::codec::{DeviceAddress, ProtocolCodec};

fuzz_target!(|data: &[u8]| {
    let durations: Vec<u16> = data
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();

    let codec = ProtocolCodec::new(DeviceAddress(0xBF40));
    if let Ok(frame) = codec.decode_pulses(&durations) {
        let packet = codec
            .encode(frame.command, frame.kind)
            .expect("decoded command must have a wire form");
        assert_eq!(codec.decode(&packet), Ok(frame));
    }
});
