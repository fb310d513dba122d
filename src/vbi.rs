/*! VBI signalling: white flag and Philips frame codes.

CAV LaserDiscs mark the first field of a film frame with a nearly
all-white VBI line (the "white flag"), and label every video frame with
a 24 bit BCD frame number on lines 16-18, one bit per two microseconds.
Both are used by the comb's pulldown logic.
*/
use crate::frame::DOTS_PER_USEC;
use crate::level::u16_to_ire;

/// Sample level counted as white when looking for the white flag.
const WHITE_FLAG_LEVEL: u16 = 45000;

/// True if the line is a white flag: more than 500 of the first 700
/// samples above the white threshold.
pub fn white_flag(line: &[u16]) -> bool {
    let wc = line[..700]
        .iter()
        .filter(|&&s| s > WHITE_FLAG_LEVEL)
        .count();
    wc > 500
}

/// Read a raw 24 bit Philips code from a VBI line.
///
/// The first sample above 90 IRE within columns 70..140 locates the
/// code; each bit then spans two microseconds and is read by averaging
/// the IRE level over the bit cell, skipping the first microsecond.
/// Returns 0 if no start bit is found.
pub fn read_philips_code(line: &[u16]) -> u32 {
    let bitlen = 2.0 * DOTS_PER_USEC;
    let mut first_bit = -1.0;
    for i in 70..140 {
        if u16_to_ire(line[i]) > 90.0 {
            first_bit = i as f64 - DOTS_PER_USEC;
            break;
        }
    }
    if first_bit < 0.0 {
        return 0;
    }

    let mut out = 0u32;
    for i in 0..24 {
        let mut val = 0.0;
        let start = (first_bit + bitlen * i as f64 + DOTS_PER_USEC) as usize;
        let end = (first_bit + bitlen * (i + 1) as f64) as usize;
        for h in start..end {
            val += u16_to_ire(line[h]);
        }
        if val / DOTS_PER_USEC > 50.0 {
            out |= 1 << (23 - i);
        }
    }
    out
}

/// Decode a raw Philips code into a decimal frame number.
///
/// Valid codes carry 0xf in the top nibble; 0xff---- codes (chapter
/// and status codes) are rejected. The five remaining nibbles are BCD.
/// Numbers above 80000 have the CAV side-two offset removed.
pub fn decode_framecode(code: u32) -> Option<u32> {
    if (code & 0xf00000) != 0xf00000 || code >= 0xff0000 {
        return None;
    }
    let mut framecode = code & 0xf;
    framecode += ((code >> 4) & 0xf) * 10;
    framecode += ((code >> 8) & 0xf) * 100;
    framecode += ((code >> 12) & 0xf) * 1000;
    framecode += ((code >> 16) & 0xf) * 10000;
    if framecode > 80000 {
        framecode -= 80000;
    }
    Some(framecode)
}
