/*! CIRC C1 error correction.

The first Reed-Solomon stage of the Cross-Interleaved Reed-Solomon
chain. Consecutive F3 frames are interleaved pairwise (even symbols
from the current frame, odd symbols from the one before), the Qm and Pm
parity symbols are un-inverted, and the resulting 32 symbol block is
decoded as RS(32,28) over GF(2^8), using the upstream error flags as
erasure positions.

Because of the one frame delay the first push produces nothing. A
failed decode is not an error: the 28 output symbols are passed through
uncorrected with every error flag set, and the C2 stage downstream gets
to deal with it.
*/
use log::{debug, info};

use reed_solomon::Decoder;

use crate::Result;
use crate::block::{Block, BlockRet};
use crate::f3frame::{F3_SYMBOLS, F3Frame};
use crate::stream::{Streamp, new_streamp};

/// Symbols in a C1 output block.
pub const C1_SYMBOLS: usize = 28;

/// Parity symbols of the C1 code.
const C1_PARITY: usize = 4;

/// One C1-corrected block: the 28 symbols left after stripping the C1
/// parity, with their error flags.
#[derive(Clone)]
pub struct C1Block {
    /// Corrected data symbols.
    pub data: [u8; C1_SYMBOLS],
    /// Error flags: all set when the decode failed.
    pub errors: [u8; C1_SYMBOLS],
}

/// Counters kept by the C1 decoder.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct C1Statistics {
    /// Blocks that decoded with zero corrections.
    pub passed: u64,
    /// Blocks that decoded with one or more corrections.
    pub corrected: u64,
    /// Blocks that failed to decode.
    pub failed: u64,
    /// Delay buffer flushes.
    pub flushed: u64,
}

/// The C1 stage as a block: F3 frames in, C1 blocks out.
pub struct C1Circ {
    src: Streamp<F3Frame>,
    dst: Streamp<C1Block>,

    current_data: [u8; F3_SYMBOLS],
    current_errors: [u8; F3_SYMBOLS],
    previous_data: [u8; F3_SYMBOLS],
    previous_errors: [u8; F3_SYMBOLS],
    level: u8,

    output: Option<C1Block>,
    rs: Decoder,
    statistics: C1Statistics,
}

impl C1Circ {
    /// Create a new C1 decoder.
    pub fn new(src: Streamp<F3Frame>) -> Self {
        Self {
            src,
            dst: new_streamp(),
            current_data: [0; F3_SYMBOLS],
            current_errors: [0; F3_SYMBOLS],
            previous_data: [0; F3_SYMBOLS],
            previous_errors: [0; F3_SYMBOLS],
            level: 0,
            output: None,
            rs: Decoder::new(C1_PARITY),
            statistics: C1Statistics::default(),
        }
    }

    /// Get the output stream.
    pub fn out(&self) -> Streamp<C1Block> {
        self.dst.clone()
    }

    /// Counters so far.
    pub fn statistics(&self) -> C1Statistics {
        self.statistics
    }

    /// Push one F3 frame through the delay line, decoding when two
    /// frames are present.
    pub fn push(&mut self, frame: &F3Frame) {
        self.previous_data = self.current_data;
        self.current_data = *frame.data_symbols();
        self.previous_errors = self.current_errors;
        self.current_errors = *frame.error_symbols();

        self.level += 1;
        if self.level > 1 {
            self.level = 2;
            let (data, errors) = self.interleave();
            self.output = Some(self.error_correct(data, errors));
        }
    }

    /// The most recent output block, if past warm-up.
    pub fn peek(&self) -> Option<&C1Block> {
        self.output.as_ref()
    }

    /// Clear the delay line, e.g. after a loss of sync upstream.
    pub fn flush(&mut self) {
        self.current_data = [0; F3_SYMBOLS];
        self.current_errors = [0; F3_SYMBOLS];
        self.previous_data = [0; F3_SYMBOLS];
        self.previous_errors = [0; F3_SYMBOLS];
        self.output = None;
        self.level = 0;
        self.statistics.flushed += 1;
    }

    /// Interleave the current and previous frame symbols, then
    /// un-invert the Qm (12..=15) and Pm (28..=31) parity symbols.
    /// The error flags are interleaved the same way but not inverted.
    fn interleave(&self) -> ([u8; F3_SYMBOLS], [u8; F3_SYMBOLS]) {
        let mut data = [0u8; F3_SYMBOLS];
        let mut errors = [0u8; F3_SYMBOLS];
        for n in (0..F3_SYMBOLS).step_by(2) {
            data[n] = self.current_data[n];
            data[n + 1] = self.previous_data[n + 1];
            errors[n] = self.current_errors[n];
            errors[n + 1] = self.previous_errors[n + 1];
        }
        for n in 12..16 {
            data[n] ^= 0xff;
        }
        for n in 28..32 {
            data[n] ^= 0xff;
        }
        (data, errors)
    }

    fn error_correct(&mut self, data: [u8; F3_SYMBOLS], errors: [u8; F3_SYMBOLS]) -> C1Block {
        let mut erasures: Vec<u8> = (0..F3_SYMBOLS as u8)
            .filter(|&n| errors[n as usize] == 1)
            .collect();
        // More marked erasures than the code can use: fall back to
        // plain error location.
        if erasures.len() > C1_PARITY {
            erasures.clear();
        }
        let erasures = if erasures.is_empty() {
            None
        } else {
            Some(&erasures[..])
        };

        let mut block = C1Block {
            data: [0; C1_SYMBOLS],
            errors: [0; C1_SYMBOLS],
        };
        let had_errors = self.rs.is_corrupted(&data);
        match self.rs.correct(&data, erasures) {
            Ok(decoded) => {
                block.data.copy_from_slice(decoded.data());
                if had_errors {
                    self.statistics.corrected += 1;
                } else {
                    self.statistics.passed += 1;
                }
            }
            Err(_) => {
                // Pass the symbols through uncorrected, all flagged.
                block.data.copy_from_slice(&data[..C1_SYMBOLS]);
                block.errors = [1; C1_SYMBOLS];
                self.statistics.failed += 1;
            }
        }
        block
    }
}

impl Block for C1Circ {
    fn block_name(&self) -> &'static str {
        "C1Circ"
    }

    fn work(&mut self) -> Result<BlockRet> {
        let ibind = self.src.clone();
        let obind = self.dst.clone();
        let mut input = ibind.lock().unwrap();
        if input.is_empty() {
            if input.eof() {
                self.flush();
                let s = self.statistics;
                info!(
                    "C1: {} passed, {} corrected, {} failed, {} flushes",
                    s.passed, s.corrected, s.failed, s.flushed
                );
                obind.lock().unwrap().set_eof();
                return Ok(BlockRet::EOF);
            }
            return Ok(BlockRet::Noop);
        }
        let mut output = obind.lock().unwrap();
        while let Some(frame) = input.pop() {
            self.push(&frame);
            if let Some(block) = self.peek() {
                output.push(block.clone());
            } else {
                debug!("C1: warming up");
            }
        }
        Ok(BlockRet::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reed_solomon::Encoder;

    /// Build an interleaved pair of F3 frames that reassemble into the
    /// given valid codeword (data + parity), with the on-disc parity
    /// inversion applied.
    fn f3_pair(codeword: &[u8]) -> (F3Frame, F3Frame) {
        assert_eq!(codeword.len(), F3_SYMBOLS);
        let mut disc = [0u8; F3_SYMBOLS];
        disc.copy_from_slice(codeword);
        for n in 12..16 {
            disc[n] ^= 0xff;
        }
        for n in 28..32 {
            disc[n] ^= 0xff;
        }
        let mut current = [0u8; F3_SYMBOLS];
        let mut previous = [0u8; F3_SYMBOLS];
        for n in (0..F3_SYMBOLS).step_by(2) {
            current[n] = disc[n];
            previous[n + 1] = disc[n + 1];
        }
        (
            F3Frame::new(0, previous, [0; F3_SYMBOLS]),
            F3Frame::new(0, current, [0; F3_SYMBOLS]),
        )
    }

    fn codeword() -> Vec<u8> {
        let data: Vec<u8> = (0..C1_SYMBOLS as u8).map(|n| n.wrapping_mul(7)).collect();
        Encoder::new(C1_PARITY).encode(&data).to_vec()
    }

    #[test]
    fn warm_up() {
        let mut c1 = C1Circ::new(crate::stream::new_streamp());
        let (first, _) = f3_pair(&codeword());
        c1.push(&first);
        assert!(c1.peek().is_none());
        assert_eq!(c1.statistics(), C1Statistics::default());
    }

    #[test]
    fn clean_block_passes() {
        let cw = codeword();
        let (first, second) = f3_pair(&cw);
        let mut c1 = C1Circ::new(crate::stream::new_streamp());
        c1.push(&first);
        c1.push(&second);
        let block = c1.peek().expect("output after two pushes");
        assert_eq!(&block.data[..], &cw[..C1_SYMBOLS]);
        assert_eq!(block.errors, [0; C1_SYMBOLS]);
        assert_eq!(c1.statistics().passed, 1);
        assert_eq!(c1.statistics().corrected, 0);
        assert_eq!(c1.statistics().failed, 0);
    }

    #[test]
    fn single_error_corrected() {
        let cw = codeword();
        let (first, mut second) = f3_pair(&cw);
        // Corrupt one even symbol; it arrives via the current frame.
        let mut data = *second.data_symbols();
        data[6] ^= 0x55;
        second = F3Frame::new(0, data, [0; F3_SYMBOLS]);
        let mut c1 = C1Circ::new(crate::stream::new_streamp());
        c1.push(&first);
        c1.push(&second);
        let block = c1.peek().unwrap();
        assert_eq!(&block.data[..], &cw[..C1_SYMBOLS]);
        assert_eq!(block.errors, [0; C1_SYMBOLS]);
        assert_eq!(c1.statistics().corrected, 1);
    }

    #[test]
    fn erasures_used() {
        let cw = codeword();
        let (first, second) = f3_pair(&cw);
        // Three flagged-but-intact symbols still decode.
        let mut errors = [0u8; F3_SYMBOLS];
        errors[0] = 1;
        errors[2] = 1;
        errors[4] = 1;
        let second = F3Frame::new(0, *second.data_symbols(), errors);
        let mut c1 = C1Circ::new(crate::stream::new_streamp());
        c1.push(&first);
        c1.push(&second);
        let block = c1.peek().unwrap();
        assert_eq!(&block.data[..], &cw[..C1_SYMBOLS]);
        assert_eq!(block.errors, [0; C1_SYMBOLS]);
        let s = c1.statistics();
        assert_eq!(s.passed + s.corrected, 1);
        assert_eq!(s.failed, 0);
    }

    #[test]
    fn garbage_fails() {
        // Six spread-out corruptions of a valid codeword are far
        // beyond the correction capability.
        let mut cw = codeword();
        for n in [0, 5, 10, 15, 20, 25] {
            cw[n] ^= 0xaa;
        }
        let (first, second) = f3_pair(&cw);
        let mut c1 = C1Circ::new(crate::stream::new_streamp());
        c1.push(&first);
        c1.push(&second);
        let block = c1.peek().unwrap();
        assert_eq!(block.errors, [1; C1_SYMBOLS]);
        assert_eq!(c1.statistics().failed, 1);
    }

    #[test]
    fn parity_inversion_is_self_inverse() {
        let cw = codeword();
        let mut twice = [0u8; F3_SYMBOLS];
        twice.copy_from_slice(&cw);
        for _ in 0..2 {
            for n in 12..16 {
                twice[n] ^= 0xff;
            }
            for n in 28..32 {
                twice[n] ^= 0xff;
            }
        }
        assert_eq!(&twice[..], &cw[..]);
    }

    #[test]
    fn statistics_account_for_every_push() {
        let cw = codeword();
        let (first, second) = f3_pair(&cw);
        let mut c1 = C1Circ::new(crate::stream::new_streamp());
        let frames = [&first, &second, &first, &second, &first];
        for f in frames {
            c1.push(f);
        }
        let s = c1.statistics();
        assert_eq!(s.passed + s.corrected + s.failed, frames.len() as u64 - 1);
    }

    #[test]
    fn flush_restarts_warm_up() {
        let cw = codeword();
        let (first, second) = f3_pair(&cw);
        let mut c1 = C1Circ::new(crate::stream::new_streamp());
        c1.push(&first);
        c1.push(&second);
        assert!(c1.peek().is_some());
        c1.flush();
        assert!(c1.peek().is_none());
        assert_eq!(c1.statistics().flushed, 1);
        c1.push(&first);
        assert!(c1.peek().is_none());
    }
}
