//! All content types into one sink.

use std::future::Future;
use std::sync::Arc;

use futures_util::FutureExt;
use log::{debug, info};

use super::{PendingRecord, RecordOutcome, Runner, WriteReport};
use crate::errors::{RunError, SinkError};
use crate::ops::OperationBlock;
use crate::render::{Framing, Renderer};
use crate::writer::{AbortSignal, ChunkWriter, Gate, Sink};

/// Shares one gate between every content type of the run.
///
/// Turns are reserved when `run` is called, so blocks land in the sink in
/// submission order even when later diffs finish first.
pub struct SingleSinkRunner<S> {
    gate: Arc<Gate<S>>,
    framing: Framing,
    renderer: Arc<dyn Renderer>,
    abort: Arc<AbortSignal>,
}

impl<S: Sink> SingleSinkRunner<S> {
    pub fn new(sink: S, framing: Framing, renderer: Arc<dyn Renderer>) -> Self {
        Self {
            gate: Gate::new(sink),
            framing,
            renderer,
            abort: Arc::new(AbortSignal::default()),
        }
    }
}

impl<S: Sink> Runner for SingleSinkRunner<S> {
    async fn init(&mut self) -> Result<(), SinkError> {
        debug!("writing header to shared sink");
        self.gate.write_frame(&self.framing.header).await
    }

    fn run<'a, P, Fut>(&'a self, record_ids: Vec<String>, mut producer: P) -> Vec<PendingRecord<'a>>
    where
        P: FnMut(String) -> Fut,
        Fut: Future<Output = Result<OperationBlock, RunError>> + 'a,
    {
        record_ids
            .into_iter()
            .map(|record| {
                // Reserve now: the ticket fixes this block's place in the sink.
                let writer = ChunkWriter::new(self.gate.reserve(), Arc::clone(&self.renderer), Arc::clone(&self.abort));
                let block = producer(record.clone());
                async move {
                    let result = match block.await {
                        Ok(block) if block.is_empty() => Ok(WriteReport { operations: 0 }),
                        Ok(block) => writer
                            .write_block(&block)
                            .await
                            .map(|_| WriteReport { operations: block.len() }),
                        Err(err) => Err(err),
                    };
                    RecordOutcome { record, result }
                }
                .boxed_local()
            })
            .collect()
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        info!("closing shared sink");
        self.gate.close(&self.framing.footer).await
    }
}
