/*! RGB frame sink.

Writes decoded frames as little endian RGB16 either to one stream
(stdout or a file), or to one `<base><framecode>.rgb` file per frame.
*/
use std::io::Write;
use std::path::Path;

use anyhow::Result;
use log::{debug, info};

use crate::block::{Block, BlockRet};
use crate::frame::RgbFrame;
use crate::graph::CancelToken;
use crate::stream::Streamp;

enum SinkMode {
    Stream(Box<dyn Write>),
    PerFrame(String),
}

/// Sink block consuming RgbFrames.
pub struct RgbSink {
    src: Streamp<RgbFrame>,
    mode: SinkMode,
    frames_written: u64,
    stop_after_first: Option<CancelToken>,
}

impl RgbSink {
    /// Write all frames to stdout.
    pub fn to_stdout(src: Streamp<RgbFrame>) -> Self {
        Self::to_writer(src, Box::new(std::io::stdout()))
    }

    /// Write all frames to one file.
    pub fn to_file(src: Streamp<RgbFrame>, path: &Path) -> Result<Self> {
        debug!("Opening sink {}", path.display());
        Ok(Self::to_writer(
            src,
            Box::new(std::fs::File::create(path)?),
        ))
    }

    /// Write all frames to one writer.
    pub fn to_writer(src: Streamp<RgbFrame>, w: Box<dyn Write>) -> Self {
        Self {
            src,
            mode: SinkMode::Stream(w),
            frames_written: 0,
            stop_after_first: None,
        }
    }

    /// Write each frame to its own `<base><framecode>.rgb` file.
    pub fn per_frame(src: Streamp<RgbFrame>, base: &str) -> Self {
        Self {
            src,
            mode: SinkMode::PerFrame(base.to_string()),
            frames_written: 0,
            stop_after_first: None,
        }
    }

    /// Cancel the graph once one frame has been written.
    pub fn stop_after_first(&mut self, token: CancelToken) {
        self.stop_after_first = Some(token);
    }

    fn write_frame(&mut self, frame: &RgbFrame) -> crate::Result<()> {
        match &mut self.mode {
            SinkMode::Stream(w) => {
                w.write_all(&frame.to_le_bytes())?;
            }
            SinkMode::PerFrame(base) => {
                let name = format!("{}{}.rgb", base, frame.framecode);
                debug!("writing {}", name);
                let mut f = std::fs::File::create(&name)?;
                f.write_all(&frame.to_le_bytes())?;
            }
        }
        self.frames_written += 1;
        if let Some(token) = &self.stop_after_first {
            token.cancel();
        }
        Ok(())
    }
}

impl Block for RgbSink {
    fn block_name(&self) -> &'static str {
        "RgbSink"
    }

    fn work(&mut self) -> crate::Result<BlockRet> {
        let ibind = self.src.clone();
        let mut input = ibind.lock().unwrap();
        if input.is_empty() {
            if input.eof() {
                if let SinkMode::Stream(w) = &mut self.mode {
                    w.flush()?;
                }
                info!("RGB sink: wrote {} frames", self.frames_written);
                return Ok(BlockRet::EOF);
            }
            return Ok(BlockRet::Noop);
        }
        while let Some(frame) = input.pop() {
            self.write_frame(&frame)?;
        }
        Ok(BlockRet::Ok)
    }
}
