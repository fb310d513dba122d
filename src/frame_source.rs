/*! Raw NTSC frame source.

Reads little endian unsigned 16 bit composite samples from a file or
stdin, one 844x505 frame at a time. A short read means the capture
ended mid-frame; the stream is terminated cleanly.
*/
use std::io::Read;
use std::path::Path;

use anyhow::Result;
use log::{debug, warn};

use crate::block::{Block, BlockRet};
use crate::frame::{FRAME_BYTES, RawFrame};
use crate::stream::{Streamp, new_streamp};

/// Source block producing RawFrames.
pub struct RawFrameSource {
    reader: Box<dyn Read>,
    dst: Streamp<RawFrame>,
    frames_read: u64,
}

impl RawFrameSource {
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
    pub fn out(&self) -> Streamp<RawFrame> {
        self.dst.clone()
    }

    /// Read one full frame; None on EOF or short read.
    fn read_frame(&mut self) -> crate::Result<Option<RawFrame>> {
        let mut buf = vec![0u8; FRAME_BYTES];
        let mut got = 0;
        while got < FRAME_BYTES {
            match self.reader.read(&mut buf[got..]) {
                Ok(0) => break,
                Ok(n) => got += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        if got == 0 {
            return Ok(None);
        }
        if got < FRAME_BYTES {
            warn!(
                "input ended mid-frame ({} of {} bytes); stopping",
                got, FRAME_BYTES
            );
            return Ok(None);
        }
        Ok(Some(RawFrame::from_le_bytes(&buf)?))
    }
}

impl Block for RawFrameSource {
    fn block_name(&self) -> &'static str {
        "RawFrameSource"
    }

    fn work(&mut self) -> crate::Result<BlockRet> {
        match self.read_frame()? {
            Some(frame) => {
                self.frames_read += 1;
                self.dst.lock().unwrap().push(frame);
                Ok(BlockRet::Ok)
            }
            None => {
                debug!("source EOF after {} frames", self.frames_read);
                self.dst.lock().unwrap().set_eof();
                Ok(BlockRet::EOF)
            }
        }
    }
}
