//! Chunk writing: rendering blocks and pushing them through a gated sink.
//!
//! - `Sink` / `BufferedSink` - destinations with explicit saturation
//! - `Gate` - ordered, exclusive access to one sink
//! - `render_block` - renders a whole block before anything is written
//! - `ChunkWriter` - writes one content type's block as a contiguous run

mod gate;
mod sink;

use std::sync::{Arc, OnceLock};

use log::debug;

use gate::SinkSlot;
pub use gate::{Gate, Turn};
pub use sink::{BufferedSink, DEFAULT_HIGH_WATER_MARK, DirectorySinkFactory, Sink, SinkFactory, WriteOutcome};

use crate::errors::RunError;
use crate::ops::OperationBlock;
use crate::render::Renderer;

/// Set once by the first fatal error of a run; every later block is refused.
#[derive(Debug, Default)]
pub struct AbortSignal(OnceLock<String>);

impl AbortSignal {
    pub fn trigger(&self, cause: impl Into<String>) {
        let _ = self.0.set(cause.into());
    }

    pub fn cause(&self) -> Option<String> {
        self.0.get().cloned()
    }

    pub(crate) fn check(&self) -> Result<(), RunError> {
        match self.cause() {
            Some(cause) => Err(RunError::Aborted { cause }),
            None => Ok(()),
        }
    }
}

/// Render every operation of `block`, refusing it if the run was aborted.
/// A render failure triggers `abort`.
pub fn render_block(
    renderer: &dyn Renderer,
    abort: &AbortSignal,
    block: &OperationBlock,
) -> Result<Vec<String>, RunError> {
    abort.check()?;
    block
        .iter()
        .map(|op| renderer.render(op))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| {
            abort.trigger(err.to_string());
            RunError::from(err)
        })
}

/// Writes one content type's block through its gate.
pub struct ChunkWriter<S> {
    turn: Turn<S>,
    renderer: Arc<dyn Renderer>,
    abort: Arc<AbortSignal>,
}

impl<S: Sink> ChunkWriter<S> {
    pub fn new(turn: Turn<S>, renderer: Arc<dyn Renderer>, abort: Arc<AbortSignal>) -> Self {
        Self { turn, renderer, abort }
    }

    /// Render the whole block, wait for this writer's turn, then write every
    /// chunk back to back. Returns the number of chunks written.
    ///
    /// Rendering happens before the first write, so a render failure never
    /// leaves half a block in the sink.
    pub async fn write_block(self, block: &OperationBlock) -> Result<usize, RunError> {
        let chunks = render_block(self.renderer.as_ref(), &self.abort, block)?;
        let mut slot = self.turn.acquire().await?;
        self.abort.check()?;
        push_all(&mut slot, &block.record, &chunks).await
    }

    /// Write chunks that were rendered before the sink was opened.
    ///
    /// The abort flag is not consulted again: once a sink exists for the
    /// block, the block is written whole.
    pub async fn write_rendered(self, record: &str, chunks: &[String]) -> Result<usize, RunError> {
        let mut slot = self.turn.acquire().await?;
        push_all(&mut slot, record, chunks).await
    }
}

async fn push_all<S: Sink>(slot: &mut SinkSlot<S>, record: &str, chunks: &[String]) -> Result<usize, RunError> {
    for chunk in chunks {
        slot.push(chunk).await?;
    }
    debug!("wrote {} chunk(s) for '{record}'", chunks.len());
    Ok(chunks.len())
}
