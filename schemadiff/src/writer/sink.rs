//! Output sinks with explicit flow control.

use std::path::PathBuf;

use log::debug;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::errors::SinkError;

/// Default buffer size after which a [`BufferedSink`] asks writers to wait.
pub const DEFAULT_HIGH_WATER_MARK: usize = 16 * 1024;

/// Result of handing a chunk to a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Accepted; more writes may follow immediately
    Accepted,
    /// Accepted, but the sink is saturated until [`Sink::drain`] resolves
    Pending,
}

/// A destination for rendered chunks.
///
/// `write` never blocks; saturation is reported through [`WriteOutcome::Pending`]
/// and the caller must await `drain` before writing again.
#[allow(async_fn_in_trait)]
pub trait Sink {
    fn write(&mut self, chunk: &str) -> Result<WriteOutcome, SinkError>;

    /// Resolve once previously accepted chunks have been flushed.
    async fn drain(&mut self) -> Result<(), SinkError>;

    /// Flush and release the sink.
    async fn close(&mut self) -> Result<(), SinkError>;
}

/// Opens one sink per content type.
#[allow(async_fn_in_trait)]
pub trait SinkFactory {
    type Sink: Sink;

    async fn open(&self, record_id: &str) -> Result<Self::Sink, SinkError>;
}

/// In-memory buffer in front of an async writer.
pub struct BufferedSink<W> {
    writer: W,
    buffer: Vec<u8>,
    high_water_mark: usize,
    closed: bool,
}

impl<W> BufferedSink<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(writer: W) -> Self {
        Self::with_high_water_mark(writer, DEFAULT_HIGH_WATER_MARK)
    }

    pub fn with_high_water_mark(writer: W, high_water_mark: usize) -> Self {
        Self {
            writer,
            buffer: Vec::new(),
            high_water_mark,
            closed: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W> Sink for BufferedSink<W>
where
    W: AsyncWrite + Unpin,
{
    fn write(&mut self, chunk: &str) -> Result<WriteOutcome, SinkError> {
        if self.closed {
            return Err(SinkError::Closed);
        }
        self.buffer.extend_from_slice(chunk.as_bytes());
        if self.buffer.len() >= self.high_water_mark {
            Ok(WriteOutcome::Pending)
        } else {
            Ok(WriteOutcome::Accepted)
        }
    }

    async fn drain(&mut self) -> Result<(), SinkError> {
        if !self.buffer.is_empty() {
            self.writer.write_all(&self.buffer).await?;
            self.buffer.clear();
        }
        self.writer.flush().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        if self.closed {
            return Ok(());
        }
        self.drain().await?;
        self.writer.shutdown().await?;
        self.closed = true;
        Ok(())
    }
}

/// Creates `<dir>/<prefix>-<record>.<extension>` files.
#[derive(Debug, Clone)]
pub struct DirectorySinkFactory {
    dir: PathBuf,
    prefix: String,
    extension: String,
}

impl DirectorySinkFactory {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
            extension: extension.into(),
        }
    }

    pub fn path_for(&self, record_id: &str) -> PathBuf {
        self.dir
            .join(format!("{}-{}.{}", self.prefix, sanitize_file_stem(record_id), self.extension))
    }
}

impl SinkFactory for DirectorySinkFactory {
    type Sink = BufferedSink<tokio::fs::File>;

    async fn open(&self, record_id: &str) -> Result<Self::Sink, SinkError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(record_id);
        debug!("opening {}", path.display());
        let file = tokio::fs::File::create(&path).await?;
        Ok(BufferedSink::new(file))
    }
}

fn sanitize_file_stem(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}
