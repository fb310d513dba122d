/*! Video frame types and NTSC geometry.

The line synchronizer upstream delivers frames as a fixed 844x505 grid
of unsigned 16 bit composite samples, oversampled at four times the
color subcarrier. Column 0 of each line is reserved for the burst
phase sentinel: the value 16384 marks a line whose color burst is
inverted relative to the line above.
*/
use crate::{Error, Result};

/// Samples per stored line.
pub const FRAME_WIDTH: usize = 844;

/// Lines per frame.
pub const FRAME_HEIGHT: usize = 505;

/// Active pixels per output line.
pub const OUT_WIDTH: usize = 744;

/// Full NTSC line length at 4x the subcarrier: 227.5 cycles.
pub const LINE_LEN: usize = 910;

/// Value written at column 0 of a phase inverted line.
pub const PHASE_SENTINEL: u16 = 16384;

/// 4x subcarrier dot clock in Hz.
pub const DOT_CLOCK: f64 = 315.0 / 88.0 * 1_000_000.0 * 4.0;

/// Samples per microsecond at the dot clock.
pub const DOTS_PER_USEC: f64 = DOT_CLOCK / 1_000_000.0;

/// Serialized size of one raw frame: little endian u16 samples.
pub const FRAME_BYTES: usize = FRAME_WIDTH * FRAME_HEIGHT * 2;

/// One digitized composite frame.
#[derive(Clone)]
pub struct RawFrame {
    samples: Vec<u16>,
}

impl RawFrame {
    /// Create an all-zero frame.
    pub fn new() -> Self {
        Self {
            samples: vec![0; FRAME_WIDTH * FRAME_HEIGHT],
        }
    }

    /// Parse a frame from exactly `FRAME_BYTES` little endian bytes.
    pub fn from_le_bytes(data: &[u8]) -> Result<Self> {
        if data.len() != FRAME_BYTES {
            return Err(Error::new(&format!(
                "raw frame needs {} bytes, got {}",
                FRAME_BYTES,
                data.len()
            )));
        }
        let samples = data
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        Ok(Self { samples })
    }

    /// All samples, line major.
    pub fn samples(&self) -> &[u16] {
        &self.samples
    }

    /// Sample at (line, column).
    pub fn sample(&self, line: usize, col: usize) -> u16 {
        self.samples[line * FRAME_WIDTH + col]
    }

    /// Set sample at (line, column).
    pub fn set_sample(&mut self, line: usize, col: usize, val: u16) {
        self.samples[line * FRAME_WIDTH + col] = val;
    }

    /// True if the line carries the burst phase inversion sentinel.
    pub fn phase_inverted(&self, line: usize) -> bool {
        self.sample(line, 0) == PHASE_SENTINEL
    }
}

impl Default for RawFrame {
    fn default() -> Self {
        Self::new()
    }
}

/// One decoded RGB frame, 16 bits per channel.
#[derive(Clone)]
pub struct RgbFrame {
    /// VBI frame number the frame was labeled with, 0 if none seen.
    pub framecode: u32,
    /// Output lines (480 or 505).
    pub lines: usize,
    data: Vec<u16>,
}

impl RgbFrame {
    /// Create a black frame with the given number of lines.
    pub fn new(lines: usize, framecode: u32) -> Self {
        Self {
            framecode,
            lines,
            data: vec![0; OUT_WIDTH * lines * 3],
        }
    }

    /// Create a frame from interleaved R,G,B samples.
    pub fn from_samples(data: &[u16], lines: usize, framecode: u32) -> Self {
        assert_eq!(data.len(), OUT_WIDTH * lines * 3);
        Self {
            framecode,
            lines,
            data: data.to_vec(),
        }
    }

    /// Interleaved R,G,B samples, line major.
    pub fn samples(&self) -> &[u16] {
        &self.data
    }

    /// The (r, g, b) triple at (line, column).
    pub fn pixel(&self, line: usize, col: usize) -> (u16, u16, u16) {
        let i = (line * OUT_WIDTH + col) * 3;
        (self.data[i], self.data[i + 1], self.data[i + 2])
    }

    /// Serialize to little endian bytes, R,G,B order.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut v = Vec::with_capacity(self.data.len() * 2);
        for s in &self.data {
            v.extend(s.to_le_bytes());
        }
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trip() -> Result<()> {
        let mut f = RawFrame::new();
        f.set_sample(10, 20, 0x1234);
        f.set_sample(40, 0, PHASE_SENTINEL);
        let bytes: Vec<u8> = f
            .samples()
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();
        let g = RawFrame::from_le_bytes(&bytes)?;
        assert_eq!(g.sample(10, 20), 0x1234);
        assert!(g.phase_inverted(40));
        assert!(!g.phase_inverted(41));
        Ok(())
    }

    #[test]
    fn short_input_rejected() {
        assert!(RawFrame::from_le_bytes(&[0u8; 100]).is_err());
    }

    #[test]
    fn rgb_sizes() {
        let f = RgbFrame::new(480, 0);
        assert_eq!(f.to_le_bytes().len(), 744 * 480 * 3 * 2);
        let f = RgbFrame::new(505, 0);
        assert_eq!(f.to_le_bytes().len(), 744 * 505 * 3 * 2);
    }
}
