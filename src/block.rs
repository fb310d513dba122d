/*! Block trait.

Blocks are the main building blocks of the decode pipelines. They each
do one thing, and are connected together with streams.
*/
use crate::Result;

/// Return type for all blocks.
///
/// This lets the graph know whether a block made progress, had nothing
/// to do, or is finished for good.
pub enum BlockRet {
    /// The block consumed input and/or produced output.
    Ok,

    /// Produced nothing, because not enough input.
    Noop,

    /// Block indicates that it will never produce more output.
    ///
    /// Examples:
    /// * reading from a file, and the file reached EOF.
    /// * all upstream blocks are at EOF and the input stream drained.
    EOF,
}

/// Block trait, that must be implemented for all blocks.
pub trait Block {
    /// Name of the block.
    ///
    /// Not the name of the *instance* of the block.
    fn block_name(&self) -> &'static str;

    /// Block work function.
    ///
    /// A pure source block will only write its output stream, and a
    /// pure sink block only reads its input stream. `work()` should
    /// consume whatever input is available before returning, so that
    /// one sweep of the graph moves data through every stage.
    fn work(&mut self) -> Result<BlockRet>;
}
