//! Clone a stream into two.
use crate::block::{Block, BlockRet};
use crate::stream::{Streamp, new_streamp};
use crate::Result;

/// Tee. Clones every input item to two output streams.
pub struct Tee<T> {
    src: Streamp<T>,
    dst1: Streamp<T>,
    dst2: Streamp<T>,
}

impl<T: Clone> Tee<T> {
    /// Create a new Tee.
    pub fn new(src: Streamp<T>) -> Self {
        Self {
            src,
            dst1: new_streamp(),
            dst2: new_streamp(),
        }
    }

    /// Get the output streams.
    pub fn out(&self) -> (Streamp<T>, Streamp<T>) {
        (self.dst1.clone(), self.dst2.clone())
    }
}

impl<T: Clone> Block for Tee<T> {
    fn block_name(&self) -> &'static str {
        "Tee"
    }

    fn work(&mut self) -> Result<BlockRet> {
        let mut i = self.src.lock().unwrap();
        if i.is_empty() {
            if i.eof() {
                self.dst1.lock().unwrap().set_eof();
                self.dst2.lock().unwrap().set_eof();
                return Ok(BlockRet::EOF);
            }
            return Ok(BlockRet::Noop);
        }
        let mut o1 = self.dst1.lock().unwrap();
        let mut o2 = self.dst2.lock().unwrap();
        while let Some(v) = i.pop() {
            o1.push(v.clone());
            o2.push(v);
        }
        Ok(BlockRet::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::new_streamp_from_slice;

    #[test]
    fn both_copies() -> Result<()> {
        let src = new_streamp_from_slice(&[1u8, 2, 3]);
        src.lock().unwrap().set_eof();
        let mut tee = Tee::new(src);
        let (a, b) = tee.out();
        tee.work()?;
        let drain = |s: Streamp<u8>| {
            let mut v = Vec::new();
            let mut s = s.lock().unwrap();
            while let Some(x) = s.pop() {
                v.push(x);
            }
            v
        };
        assert_eq!(drain(a), vec![1, 2, 3]);
        assert_eq!(drain(b), vec![1, 2, 3]);
        Ok(())
    }
}
