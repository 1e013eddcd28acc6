//! Shared helpers for integration tests: an in-memory sink with scripted
//! saturation and failures, plus small model builders.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io;
use std::sync::{Arc, Mutex};

use schemadiff::errors::RenderError;
use schemadiff::model::{Field, FieldType, RecordType, Snapshot, WidgetAssignment};
use schemadiff::{
    MigrationOperation, MigrationScriptRenderer, Renderer, Sink, SinkError, SinkFactory, SnapshotIndex, WriteOutcome,
};

/// Everything a [`ScriptedSink`] observed, shared with the test body.
#[derive(Debug, Default)]
pub struct SinkRecord {
    pub chunks: Vec<String>,
    pub drains: usize,
    pub closed: bool,
    /// Set if a chunk arrived while the sink was saturated.
    pub overrun: bool,
}

pub type SinkLog = Arc<Mutex<SinkRecord>>;

pub struct ScriptedSink {
    log: SinkLog,
    pending_every: Option<usize>,
    fail_on: Option<usize>,
    fail_close: bool,
    writes: usize,
    saturated: bool,
}

impl ScriptedSink {
    pub fn new() -> (Self, SinkLog) {
        let log = SinkLog::default();
        let sink = Self {
            log: Arc::clone(&log),
            pending_every: None,
            fail_on: None,
            fail_close: false,
            writes: 0,
            saturated: false,
        };
        (sink, log)
    }

    /// Report saturation after every `n`-th accepted write.
    pub fn pending_every(mut self, n: usize) -> Self {
        self.pending_every = Some(n);
        self
    }

    /// Fail the write with this zero-based index.
    pub fn fail_on(mut self, index: usize) -> Self {
        self.fail_on = Some(index);
        self
    }

    /// Fail the final flush on close.
    pub fn fail_close(mut self) -> Self {
        self.fail_close = true;
        self
    }
}

impl Sink for ScriptedSink {
    fn write(&mut self, chunk: &str) -> Result<WriteOutcome, SinkError> {
        let index = self.writes;
        self.writes += 1;
        let mut log = self.log.lock().unwrap();
        if self.saturated {
            log.overrun = true;
        }
        if self.fail_on == Some(index) {
            return Err(io::Error::other("disk full").into());
        }
        log.chunks.push(chunk.to_string());
        match self.pending_every {
            Some(n) if (index + 1) % n == 0 => {
                self.saturated = true;
                Ok(WriteOutcome::Pending)
            }
            _ => Ok(WriteOutcome::Accepted),
        }
    }

    async fn drain(&mut self) -> Result<(), SinkError> {
        tokio::task::yield_now().await;
        self.saturated = false;
        self.log.lock().unwrap().drains += 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        if self.fail_close {
            return Err(io::Error::other("flush failed").into());
        }
        self.log.lock().unwrap().closed = true;
        Ok(())
    }
}

/// Opens one [`ScriptedSink`] per content type and keeps their logs.
#[derive(Default)]
pub struct ScriptedFactory {
    pub logs: Mutex<BTreeMap<String, SinkLog>>,
    failing: Option<String>,
}

impl ScriptedFactory {
    /// The sink opened for `record` accepts the header, then fails.
    pub fn failing(record: &str) -> Self {
        Self {
            failing: Some(record.to_string()),
            ..Self::default()
        }
    }

    pub fn log(&self, record: &str) -> Option<SinkLog> {
        self.logs.lock().unwrap().get(record).cloned()
    }

    pub fn chunks(&self, record: &str) -> Option<Vec<String>> {
        let logs = self.logs.lock().unwrap();
        logs.get(record).map(|log| log.lock().unwrap().chunks.clone())
    }

    pub fn opened(&self) -> Vec<String> {
        self.logs.lock().unwrap().keys().cloned().collect()
    }
}

impl SinkFactory for &ScriptedFactory {
    type Sink = ScriptedSink;

    async fn open(&self, record_id: &str) -> Result<Self::Sink, SinkError> {
        let (sink, log) = ScriptedSink::new();
        self.logs.lock().unwrap().insert(record_id.to_string(), log);
        if self.failing.as_deref() == Some(record_id) {
            return Ok(sink.fail_on(1));
        }
        Ok(sink)
    }
}

/// Refuses to render anything for one content type.
pub struct RefusingRenderer(pub &'static str);

impl Renderer for RefusingRenderer {
    fn render(&self, op: &MigrationOperation) -> Result<String, RenderError> {
        if op.record_id() == self.0 {
            return Err(RenderError::Unsupported {
                kind: op.kind(),
                record: op.record_id().to_string(),
                reason: "refused".into(),
            });
        }
        MigrationScriptRenderer.render(op)
    }
}

pub fn chunks(log: &SinkLog) -> Vec<String> {
    log.lock().unwrap().chunks.clone()
}

pub fn index(records: Vec<RecordType>, widgets: Vec<WidgetAssignment>) -> SnapshotIndex {
    SnapshotIndex::new(Snapshot {
        content_types: records,
        editor_interfaces: widgets,
    })
    .unwrap()
}

/// A content type whose fields are all short text.
pub fn record(id: &str, fields: &[&str]) -> RecordType {
    fields
        .iter()
        .fold(RecordType::new(id, id), |r, f| r.with_field(Field::new(*f, FieldType::Symbol)))
}
