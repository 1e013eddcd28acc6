//! One sink per content type.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::FutureExt;
use log::{debug, warn};

use super::{PendingRecord, RecordOutcome, Runner, WriteReport};
use crate::errors::{RunError, SinkError};
use crate::ops::OperationBlock;
use crate::render::{Framing, Renderer};
use crate::writer::{AbortSignal, ChunkWriter, Gate, SinkFactory, render_block};

/// Opens a sink the first time a content type has something to write.
///
/// Sinks are independent, so blocks are written as soon as they are ready with
/// no ordering between content types. A block is rendered before its sink is
/// opened, so a content type that fails to render leaves no file behind.
pub struct PerRecordRunner<F: SinkFactory> {
    factory: F,
    framing: Framing,
    renderer: Arc<dyn Renderer>,
    abort: Arc<AbortSignal>,
    gates: Mutex<BTreeMap<String, Arc<Gate<F::Sink>>>>,
}

impl<F: SinkFactory> PerRecordRunner<F> {
    pub fn new(factory: F, framing: Framing, renderer: Arc<dyn Renderer>) -> Self {
        Self {
            factory,
            framing,
            renderer,
            abort: Arc::new(AbortSignal::default()),
            gates: Mutex::new(BTreeMap::new()),
        }
    }

    fn gates(&self) -> MutexGuard<'_, BTreeMap<String, Arc<Gate<F::Sink>>>> {
        self.gates.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open the content type's sink and write the header.
    ///
    /// The map is not locked while opening, so sinks of different content
    /// types open concurrently. Each content type is submitted once per pass.
    async fn gate_for(&self, record: &str) -> Result<Arc<Gate<F::Sink>>, SinkError> {
        if let Some(gate) = self.gates().get(record) {
            return Ok(Arc::clone(gate));
        }
        debug!("opening sink for '{record}'");
        let gate = Gate::new(self.factory.open(record).await?);
        // Registered before the header so `close` releases it even if the header fails.
        self.gates().insert(record.to_string(), Arc::clone(&gate));
        gate.write_frame(&self.framing.header).await?;
        Ok(gate)
    }

    async fn write(&self, block: OperationBlock) -> Result<WriteReport, RunError> {
        if block.is_empty() {
            return Ok(WriteReport { operations: 0 });
        }
        let chunks = render_block(self.renderer.as_ref(), &self.abort, &block)?;
        let gate = self.gate_for(&block.record).await?;
        let writer = ChunkWriter::new(gate.reserve(), Arc::clone(&self.renderer), Arc::clone(&self.abort));
        writer.write_rendered(&block.record, &chunks).await?;
        Ok(WriteReport {
            operations: block.len(),
        })
    }
}

impl<F: SinkFactory> Runner for PerRecordRunner<F> {
    async fn init(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    fn run<'a, P, Fut>(&'a self, record_ids: Vec<String>, mut producer: P) -> Vec<PendingRecord<'a>>
    where
        P: FnMut(String) -> Fut,
        Fut: Future<Output = Result<OperationBlock, RunError>> + 'a,
    {
        record_ids
            .into_iter()
            .map(|record| {
                let block = producer(record.clone());
                async move {
                    let result = match block.await {
                        Ok(block) => self.write(block).await,
                        Err(err) => Err(err),
                    };
                    RecordOutcome { record, result }
                }
                .boxed_local()
            })
            .collect()
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        let gates = std::mem::take(self.gates.get_mut().unwrap_or_else(PoisonError::into_inner));
        let mut first_error = None;
        for (record, gate) in gates {
            if let Err(err) = gate.close(&self.framing.footer).await {
                warn!("failed to close sink for '{record}': {err}");
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
