//! Sink block collecting items into a vector.
use std::sync::{Arc, Mutex};

use crate::block::{Block, BlockRet};
use crate::stream::Streamp;
use crate::Result;

/// Collect everything from the input stream. Mostly useful for testing.
pub struct VectorSink<T> {
    src: Streamp<T>,
    data: Arc<Mutex<Vec<T>>>,
}

impl<T> VectorSink<T> {
    /// Create a new vector sink.
    pub fn new(src: Streamp<T>) -> Self {
        Self {
            src,
            data: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Get a handle on the collected data.
    ///
    /// The handle stays valid after the sink is moved into a graph.
    pub fn data(&self) -> Arc<Mutex<Vec<T>>> {
        self.data.clone()
    }
}

impl<T> Block for VectorSink<T> {
    fn block_name(&self) -> &'static str {
        "VectorSink"
    }

    fn work(&mut self) -> Result<BlockRet> {
        let mut i = self.src.lock().unwrap();
        if i.is_empty() {
            if i.eof() {
                return Ok(BlockRet::EOF);
            }
            return Ok(BlockRet::Noop);
        }
        let mut data = self.data.lock().unwrap();
        while let Some(v) = i.pop() {
            data.push(v);
        }
        Ok(BlockRet::Ok)
    }
}
