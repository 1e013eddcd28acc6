//! Runner strategies: where each content type's block is written.
//!
//! - `SingleSinkRunner` - every block into one shared, ordered sink
//! - `PerRecordRunner` - one sink per content type, opened on first write

mod per_record;
mod single;

use std::future::Future;

use futures_util::future::LocalBoxFuture;

pub use per_record::PerRecordRunner;
pub use single::SingleSinkRunner;

use crate::errors::{RunError, SinkError};
use crate::ops::OperationBlock;

/// Successful write of one content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteReport {
    /// Operations written; zero means nothing changed
    pub operations: usize,
}

/// Final result for one content type.
#[derive(Debug, Clone)]
pub struct RecordOutcome {
    pub record: String,
    pub result: Result<WriteReport, RunError>,
}

/// A not-yet-completed write for one content type.
pub type PendingRecord<'a> = LocalBoxFuture<'a, RecordOutcome>;

/// Sink placement policy.
///
/// `run` hands back one pending result per identifier, in the order given; the
/// caller drives them together. A producer computes the block for one
/// identifier.
#[allow(async_fn_in_trait)]
pub trait Runner {
    /// Acquire sinks that exist for the whole run.
    async fn init(&mut self) -> Result<(), SinkError>;

    fn run<'a, P, Fut>(&'a self, record_ids: Vec<String>, producer: P) -> Vec<PendingRecord<'a>>
    where
        P: FnMut(String) -> Fut,
        Fut: Future<Output = Result<OperationBlock, RunError>> + 'a;

    /// Write footers, flush and release every sink.
    async fn close(&mut self) -> Result<(), SinkError>;
}
