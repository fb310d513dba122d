//! Source block emitting a fixed vector of items.
use crate::block::{Block, BlockRet};
use crate::stream::{Streamp, new_streamp};
use crate::Result;

/// Emit the items of a vector, then EOF. Mostly useful for testing.
pub struct VectorSource<T> {
    data: Vec<T>,
    dst: Streamp<T>,
}

impl<T> VectorSource<T> {
    /// Create a new vector source.
    pub fn new(data: Vec<T>) -> Self {
        Self {
            data,
            dst: new_streamp(),
        }
    }

    /// Get the output stream.
    pub fn out(&self) -> Streamp<T> {
        self.dst.clone()
    }
}

impl<T> Block for VectorSource<T> {
    fn block_name(&self) -> &'static str {
        "VectorSource"
    }

    fn work(&mut self) -> Result<BlockRet> {
        let mut o = self.dst.lock().unwrap();
        o.write(self.data.drain(..));
        o.set_eof();
        Ok(BlockRet::EOF)
    }
}
