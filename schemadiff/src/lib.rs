//! schemadiff core library.
//!
//! Compares two snapshots of a content model and turns the difference into
//! ordered migration operations, rendered as script chunks and written through
//! a runner strategy.
//!
//! The main entry points are [`SnapshotIndex`] for loaded snapshots,
//! [`plan`] for the ordered operation blocks and [`generate`] for a complete
//! run against a [`Runner`].

pub mod differ;
pub mod errors;
pub mod index;
pub mod model;
pub mod ops;
pub mod pipeline;
pub mod render;
pub mod runner;
pub mod sequencer;
pub mod writer;

use std::path::Path;

pub use errors::*;
pub use index::SnapshotIndex;
pub use model::{RecordType, Snapshot, WidgetAssignment};
pub use ops::{MigrationOperation, OperationBlock};
pub use pipeline::{RecordStatus, RecordSummary, RunSummary, generate, plan};
pub use render::{Flavor, Framing, MigrationScriptRenderer, Renderer};
pub use runner::{PerRecordRunner, Runner, SingleSinkRunner};
pub use writer::{BufferedSink, DirectorySinkFactory, Sink, SinkFactory, WriteOutcome};

/// Read a snapshot export (`{ "contentTypes": [...], "editorInterfaces": [...] }`) from disk.
pub async fn load_snapshot(path: impl AsRef<Path>) -> Result<Snapshot, LoadError> {
    let path = path.as_ref();
    let raw = tokio::fs::read(path).await.map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&raw).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
