/*! C1 block to F2 frame adapter.

The full C2 stage (delay-line deinterleave plus a second Reed-Solomon
pass) would sit between C1 and the audio payload; it is not implemented
here. This adapter stands at its interface: the first 24 symbols of
each C1 block become the F2 frame, carrying the C1 error flags through.
*/
use crate::Result;
use crate::block::{Block, BlockRet};
use crate::c1_circ::C1Block;
use crate::f2frame::{F2_SYMBOLS, F2Frame};
use crate::stream::{Streamp, new_streamp};

/// Converter block: C1 blocks in, F2 frames out.
pub struct C1ToF2 {
    src: Streamp<C1Block>,
    dst: Streamp<F2Frame>,
}

impl C1ToF2 {
    /// Create a new converter.
    pub fn new(src: Streamp<C1Block>) -> Self {
        Self {
            src,
            dst: new_streamp(),
        }
    }

    /// Get the output stream.
    pub fn out(&self) -> Streamp<F2Frame> {
        self.dst.clone()
    }
}

impl Block for C1ToF2 {
    fn block_name(&self) -> &'static str {
        "C1ToF2"
    }

    fn work(&mut self) -> Result<BlockRet> {
        let mut i = self.src.lock().unwrap();
        if i.is_empty() {
            if i.eof() {
                self.dst.lock().unwrap().set_eof();
                return Ok(BlockRet::EOF);
            }
            return Ok(BlockRet::Noop);
        }
        let mut o = self.dst.lock().unwrap();
        while let Some(block) = i.pop() {
            let mut data = [0u8; F2_SYMBOLS];
            let mut errors = [0u8; F2_SYMBOLS];
            data.copy_from_slice(&block.data[..F2_SYMBOLS]);
            errors.copy_from_slice(&block.errors[..F2_SYMBOLS]);
            o.push(F2Frame::new(data, errors));
        }
        Ok(BlockRet::Ok)
    }
}
