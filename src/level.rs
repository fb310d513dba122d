/*! IRE level conversions.

Samples arrive as unsigned 16 bit values scaled so that one IRE is
327.67 counts with the range offset to put -60 IRE at code 1. Code 0 is
reserved as the sync sentinel.
*/

/// Counts per IRE.
pub const IRESCALE: f64 = 327.67;

/// Code for -60 IRE.
pub const IREBASE: f64 = 1.0;

/// NTSC setup: black sits above blanking.
pub const DEFAULT_BLACK_IRE: f64 = 7.5;

/// Clamp a value to a range.
pub fn clamp(v: f64, low: f64, high: f64) -> f64 {
    if v < low {
        low
    } else if v > high {
        high
    } else {
        v
    }
}

/// Convert an IRE level to the 16 bit sample scale.
pub fn ire_to_u16(ire: f64) -> u16 {
    if ire <= -60.0 {
        return 0;
    }
    clamp((ire + 60.0) * IRESCALE + IREBASE, 1.0, 65535.0) as u16
}

/// Convert a 16 bit sample to IRE. Code 0 reads as -100 (sync).
pub fn u16_to_ire(level: u16) -> f64 {
    if level == 0 {
        return -100.0;
    }
    -60.0 + (level as f64 - IREBASE) / IRESCALE
}
