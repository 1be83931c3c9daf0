//! NEC-style mark/space timing: constants and the bit-level view of a packet.
//!
//! A frame on the wire is
//!
//! ```text
//!  9000 mark | 4500 space | 32 × (560 mark, 560|1690 space) | 560 mark | 560 space
//! ```
//!
//! Captured frames contain the inter-edge durations only, so the closing
//! space is never observed: a complete capture is 2 + 64 + 1 = 67 pulses,
//! and decoding needs at least the 66 pulses up to the last data space.

use crate::error::CodecError;

pub const HEADER_MARK_US: u16 = 9000;
pub const HEADER_SPACE_US: u16 = 4500;
pub const BIT_MARK_US: u16 = 560;
pub const ZERO_SPACE_US: u16 = 560;
pub const ONE_SPACE_US: u16 = 1690;
pub const TRAILER_MARK_US: u16 = 560;
pub const TRAILER_SPACE_US: u16 = 560;

/// Idle time after which the line is considered between frames.
pub const FRAME_GAP_US: u32 = 14_000;
/// Shorter edges are treated as noise.
pub const MIN_PULSE_US: u32 = 80;
/// Accepted deviation on every timing comparison.
pub const TOLERANCE_US: u16 = 300;

pub const PACKET_BYTES: usize = 4;
pub const PACKET_BITS: usize = PACKET_BYTES * 8;
/// Pulses required before a decode is attempted (header + data cells).
pub const MIN_FRAME_PULSES: usize = 2 + PACKET_BITS * 2;
/// Pulses emitted for one frame, including the closing mark/space pair.
pub const FRAME_PULSES: usize = MIN_FRAME_PULSES + 2;
/// Capacity of a captured raw frame.
pub const MAX_PULSES: usize = 128;

/// Order in which the bits of each payload byte go on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitOrder {
    LsbFirst,
    MsbFirst,
}

impl BitOrder {
    /// Mask selecting the `bit`-th transmitted bit of its byte.
    pub const fn mask(self, bit: usize) -> u8 {
        match self {
            Self::LsbFirst => 1 << (bit % 8),
            Self::MsbFirst => 0x80 >> (bit % 8),
        }
    }
}

/// Shared by the transmitter, the capture decoder and the codec.
pub const BIT_ORDER: BitOrder = BitOrder::LsbFirst;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Mark,
    Space,
}

/// One carrier-on or carrier-off interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pulse {
    pub level: Level,
    pub duration_us: u16,
}

impl Pulse {
    pub const fn mark(duration_us: u16) -> Self {
        Self { level: Level::Mark, duration_us }
    }

    pub const fn space(duration_us: u16) -> Self {
        Self { level: Level::Space, duration_us }
    }
}

/// `measured` is within ±[`TOLERANCE_US`] of `target`.
pub const fn within_tolerance(measured: u16, target: u16) -> bool {
    let measured = measured as u32;
    let target = target as u32;
    let tol = TOLERANCE_US as u32;
    measured + tol >= target && measured <= target + tol
}

/// Lay out the four packet bytes as a full mark/space frame.
pub fn encode_pulses(bytes: [u8; PACKET_BYTES]) -> [Pulse; FRAME_PULSES] {
    let mut train = [Pulse::space(0); FRAME_PULSES];
    train[0] = Pulse::mark(HEADER_MARK_US);
    train[1] = Pulse::space(HEADER_SPACE_US);

    for bit in 0..PACKET_BITS {
        let one = bytes[bit / 8] & BIT_ORDER.mask(bit) != 0;
        train[2 + bit * 2] = Pulse::mark(BIT_MARK_US);
        train[3 + bit * 2] = Pulse::space(if one { ONE_SPACE_US } else { ZERO_SPACE_US });
    }

    train[FRAME_PULSES - 2] = Pulse::mark(TRAILER_MARK_US);
    train[FRAME_PULSES - 1] = Pulse::space(TRAILER_SPACE_US);
    train
}

/// Recover packet bytes from captured inter-edge durations.
///
/// The header may appear anywhere in the buffer; leading noise is skipped.
pub fn decode_pulses(pulses: &[u16]) -> Result<[u8; PACKET_BYTES], CodecError> {
    if pulses.len() < MIN_FRAME_PULSES {
        return Err(CodecError::BadTiming);
    }

    let start = pulses
        .windows(2)
        .position(|w| within_tolerance(w[0], HEADER_MARK_US) && within_tolerance(w[1], HEADER_SPACE_US))
        .map(|i| i + 2)
        .ok_or(CodecError::BadTiming)?;

    let cells = pulses.get(start..start + PACKET_BITS * 2).ok_or(CodecError::BadTiming)?;

    let mut bytes = [0u8; PACKET_BYTES];
    for (bit, cell) in cells.chunks_exact(2).enumerate() {
        if !within_tolerance(cell[0], BIT_MARK_US) {
            return Err(CodecError::BadTiming);
        }
        if within_tolerance(cell[1], ONE_SPACE_US) {
            bytes[bit / 8] |= BIT_ORDER.mask(bit);
        } else if !within_tolerance(cell[1], ZERO_SPACE_US) {
            return Err(CodecError::BadTiming);
        }
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn durations(bytes: [u8; 4]) -> Vec<u16> {
        encode_pulses(bytes).iter().map(|p| p.duration_us).collect()
    }

    #[test]
    fn frame_layout() {
        let train = encode_pulses([0x40, 0xBF, 0x01, 0xFE]);
        assert_eq!(train.len(), 68);
        assert_eq!(train[0], Pulse::mark(9000));
        assert_eq!(train[1], Pulse::space(4500));
        // LSB of 0x40 is 0, bit 6 is 1.
        assert_eq!(train[3], Pulse::space(560));
        assert_eq!(train[2 + 6 * 2 + 1], Pulse::space(1690));
        assert_eq!(train[66], Pulse::mark(560));
        assert_eq!(train[67], Pulse::space(560));
        assert!(train.iter().step_by(2).all(|p| p.level == Level::Mark));
    }

    #[test]
    fn decodes_captured_frame_without_closing_space() {
        let mut pulses = durations([0x12, 0x34, 0xA3, 0x5C]);
        pulses.pop();
        assert_eq!(decode_pulses(&pulses), Ok([0x12, 0x34, 0xA3, 0x5C]));
    }

    #[test]
    fn minimum_length_gate() {
        let pulses = durations([0x40, 0xBF, 0x02, 0xFD]);
        assert!(decode_pulses(&pulses[..66]).is_ok());
        assert_eq!(decode_pulses(&pulses[..65]), Err(CodecError::BadTiming));
    }

    #[test]
    fn bit_mark_tolerance_boundary() {
        let base = durations([0x40, 0xBF, 0x01, 0xFE]);
        for (mark, ok) in [(260, true), (860, true), (259, false), (861, false)] {
            let mut pulses = base.clone();
            pulses[10] = mark;
            assert_eq!(decode_pulses(&pulses).is_ok(), ok, "bit mark {mark}");
        }
    }

    #[test]
    fn header_found_after_noise() {
        let mut pulses = vec![120, 300, 7000];
        pulses.extend(durations([0xAA, 0x55, 0x04, 0xFB]));
        assert_eq!(decode_pulses(&pulses), Ok([0xAA, 0x55, 0x04, 0xFB]));
    }

    #[test]
    fn ambiguous_space_rejected() {
        let mut pulses = durations([0, 0, 0, 0]);
        pulses[3] = 1100;
        assert_eq!(decode_pulses(&pulses), Err(CodecError::BadTiming));
    }

    #[test]
    fn missing_header_rejected() {
        let mut pulses = durations([1, 2, 3, 4]);
        pulses[0] = 5000;
        assert_eq!(decode_pulses(&pulses), Err(CodecError::BadTiming));
    }

    #[test]
    fn bit_order_masks() {
        assert_eq!(BitOrder::LsbFirst.mask(0), 0x01);
        assert_eq!(BitOrder::LsbFirst.mask(15), 0x80);
        assert_eq!(BitOrder::MsbFirst.mask(0), 0x80);
        assert_eq!(BitOrder::MsbFirst.mask(9), 0x40);
    }
}
