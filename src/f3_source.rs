/*! F3 frame source.

Reads serialized F3 frame records (subcode symbol, 32 data symbols, 32
error flags) from a file or stdin. A short read terminates the stream
cleanly.
*/
use std::io::Read;
use std::path::Path;

use anyhow::Result;
use log::{debug, warn};

use crate::block::{Block, BlockRet};
use crate::f3frame::{F3_RECORD_BYTES, F3Frame};
use crate::stream::{Streamp, new_streamp};

/// Source block producing F3Frames.
pub struct F3FrameSource {
    reader: Box<dyn Read>,
    dst: Streamp<F3Frame>,
    frames_read: u64,
}

impl F3FrameSource {
    /// Create a source reading from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Opening source {}", path.display());
        Ok(Self::from_reader(Box::new(std::fs::File::open(path)?)))
    }

    /// Create a source reading from stdin.
    pub fn from_stdin() -> Self {
        Self::from_reader(Box::new(std::io::stdin()))
    }

    /// Create a source from any reader.
    pub fn from_reader(reader: Box<dyn Read>) -> Self {
        Self {
            reader,
            dst: new_streamp(),
            frames_read: 0,
        }
    }

    /// Get the output stream.
    pub fn out(&self) -> Streamp<F3Frame> {
        self.dst.clone()
    }
}

impl Block for F3FrameSource {
    fn block_name(&self) -> &'static str {
        "F3FrameSource"
    }

    fn work(&mut self) -> crate::Result<BlockRet> {
        // Read a batch of records per sweep to keep the pipeline busy
        // without buffering the whole input.
        const BATCH: usize = 98;
        let mut buf = [0u8; F3_RECORD_BYTES];
        for _ in 0..BATCH {
            let mut got = 0;
            while got < F3_RECORD_BYTES {
                match self.reader.read(&mut buf[got..]) {
                    Ok(0) => break,
                    Ok(n) => got += n,
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e.into()),
                }
            }
            if got < F3_RECORD_BYTES {
                if got > 0 {
                    warn!(
                        "input ended mid-record ({} of {} bytes); stopping",
                        got, F3_RECORD_BYTES
                    );
                }
                debug!("source EOF after {} F3 frames", self.frames_read);
                self.dst.lock().unwrap().set_eof();
                return Ok(BlockRet::EOF);
            }
            self.frames_read += 1;
            self.dst.lock().unwrap().push(F3Frame::from_record(&buf)?);
        }
        Ok(BlockRet::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_records() -> Result<()> {
        let tmpd = tempfile::tempdir()?;
        let path = tmpd.path().join("f3.bin");
        let mut f = std::fs::File::create(&path)?;
        let mut rec = [0u8; F3_RECORD_BYTES];
        rec[0] = 0x12;
        f.write_all(&rec)?;
        rec[0] = 0x34;
        f.write_all(&rec)?;
        drop(f);

        let mut src = F3FrameSource::from_file(&path)?;
        let out = src.out();
        while !matches!(src.work()?, BlockRet::EOF) {}
        let mut s = out.lock().unwrap();
        assert_eq!(s.available(), 2);
        assert_eq!(s.pop().unwrap().subcode_symbol(), 0x12);
        assert_eq!(s.pop().unwrap().subcode_symbol(), 0x34);
        Ok(())
    }
}
