/*! F3 frames.

An F3 frame is one EFM frame after demodulation: 32 data symbols with a
parallel set of error flags (0 = good, 1 = erasure) plus the frame's
subcode symbol. The demodulator that produces these is upstream of
this crate.
*/
use crate::{Error, Result};

/// Data symbols per F3 frame.
pub const F3_SYMBOLS: usize = 32;

/// Serialized record: subcode symbol, data symbols, error flags.
pub const F3_RECORD_BYTES: usize = 1 + 2 * F3_SYMBOLS;

/// One F3 frame.
#[derive(Clone, Default)]
pub struct F3Frame {
    subcode: u8,
    data: [u8; F3_SYMBOLS],
    errors: [u8; F3_SYMBOLS],
}

impl F3Frame {
    /// Create a frame from its parts.
    pub fn new(subcode: u8, data: [u8; F3_SYMBOLS], errors: [u8; F3_SYMBOLS]) -> Self {
        Self {
            subcode,
            data,
            errors,
        }
    }

    /// Parse a frame from a serialized record.
    pub fn from_record(rec: &[u8]) -> Result<Self> {
        if rec.len() != F3_RECORD_BYTES {
            return Err(Error::new(&format!(
                "F3 record needs {} bytes, got {}",
                F3_RECORD_BYTES,
                rec.len()
            )));
        }
        let mut f = Self {
            subcode: rec[0],
            ..Default::default()
        };
        f.data.copy_from_slice(&rec[1..1 + F3_SYMBOLS]);
        f.errors.copy_from_slice(&rec[1 + F3_SYMBOLS..]);
        Ok(f)
    }

    /// The 32 data symbols.
    pub fn data_symbols(&self) -> &[u8; F3_SYMBOLS] {
        &self.data
    }

    /// The 32 error flags.
    pub fn error_symbols(&self) -> &[u8; F3_SYMBOLS] {
        &self.errors
    }

    /// The subcode symbol.
    pub fn subcode_symbol(&self) -> u8 {
        self.subcode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_round_trip() -> Result<()> {
        let mut rec = [0u8; F3_RECORD_BYTES];
        rec[0] = 0x40;
        rec[1] = 0xaa;
        rec[32] = 0xbb;
        rec[33] = 1;
        let f = F3Frame::from_record(&rec)?;
        assert_eq!(f.subcode_symbol(), 0x40);
        assert_eq!(f.data_symbols()[0], 0xaa);
        assert_eq!(f.data_symbols()[31], 0xbb);
        assert_eq!(f.error_symbols()[0], 1);
        assert!(F3Frame::from_record(&rec[..10]).is_err());
        Ok(())
    }
}
