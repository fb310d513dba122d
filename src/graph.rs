/*! Graph of blocks.

The graph owns the blocks and runs them cooperatively on the current
thread, sweeping over all blocks until everything has reached EOF.
*/
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;

use crate::Result;
use crate::block::{Block, BlockRet};

/// Token used to stop a running graph early.
///
/// Clone it before adding blocks, hand it to whatever should be able
/// to stop the run (a signal handler, a sink that has seen enough).
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<AtomicBool>,
}

impl CancelToken {
    fn new() -> Self {
        Self {
            inner: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request that the graph stop at the next sweep.
    pub fn cancel(&self) {
        self.inner.store(true, Ordering::SeqCst);
    }

    /// True if cancel() has been called.
    pub fn is_canceled(&self) -> bool {
        self.inner.load(Ordering::SeqCst)
    }
}

/// Graph, a collection of blocks connected with streams.
pub struct Graph {
    blocks: Vec<Box<dyn Block>>,
    done: Vec<bool>,
    cancel: CancelToken,
}

impl Graph {
    /// Create a new graph.
    pub fn new() -> Self {
        Self {
            blocks: Vec::new(),
            done: Vec::new(),
            cancel: CancelToken::new(),
        }
    }

    /// Add a block to the graph.
    ///
    /// Blocks are swept in insertion order, so add them source first
    /// for best throughput.
    pub fn add(&mut self, b: Box<dyn Block>) {
        self.blocks.push(b);
        self.done.push(false);
    }

    /// Get a cancellation token for stopping the graph run.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Run the graph until all blocks are at EOF, nothing can make
    /// progress, or the run is canceled.
    pub fn run(&mut self) -> Result<()> {
        loop {
            if self.cancel.is_canceled() {
                debug!("graph: canceled");
                return Ok(());
            }
            let mut progress = false;
            for (n, b) in self.blocks.iter_mut().enumerate() {
                if self.done[n] {
                    continue;
                }
                match b.work()? {
                    BlockRet::Ok => progress = true,
                    BlockRet::Noop => {}
                    BlockRet::EOF => {
                        debug!("graph: {} EOF", b.block_name());
                        self.done[n] = true;
                        progress = true;
                    }
                }
            }
            if self.done.iter().all(|d| *d) {
                debug!("graph: all blocks done");
                return Ok(());
            }
            if !progress {
                debug!("graph: no progress, stopping");
                return Ok(());
            }
        }
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_sink::VectorSink;
    use crate::vector_source::VectorSource;

    #[test]
    fn source_to_sink() -> Result<()> {
        let src = VectorSource::new(vec![1u32, 2, 3, 4]);
        let sink = VectorSink::new(src.out());
        let data = sink.data();
        let mut g = Graph::new();
        g.add(Box::new(src));
        g.add(Box::new(sink));
        g.run()?;
        assert_eq!(*data.lock().unwrap(), vec![1, 2, 3, 4]);
        Ok(())
    }

    #[test]
    fn cancel_stops_run() -> Result<()> {
        let src = VectorSource::new(vec![0u8; 16]);
        let sink = VectorSink::new(src.out());
        let mut g = Graph::new();
        g.cancel_token().cancel();
        g.add(Box::new(src));
        g.add(Box::new(sink));
        // Already canceled, so nothing should run.
        g.run()?;
        Ok(())
    }
}
