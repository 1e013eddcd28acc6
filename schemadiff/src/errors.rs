use std::borrow::Cow;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Inconsistency in a loaded snapshot or in a single content type definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// Two content types in one snapshot share an identifier.
    #[error("duplicate content type '{id}' in snapshot")]
    DuplicateRecordType { id: String },

    /// Two editor interfaces in one snapshot point at the same content type.
    #[error("duplicate editor interface for content type '{id}'")]
    DuplicateWidgetAssignment { id: String },

    /// An editor interface lists the same field twice.
    #[error("editor interface of '{record}' has more than one control for field '{field}'")]
    DuplicateWidgetControl { record: String, field: String },

    /// A content type declares the same field identifier twice.
    #[error("content type '{record}' declares field '{field}' more than once")]
    DuplicateField { record: String, field: String },

    /// A field definition violates the type/items/link-type invariants.
    #[error("field '{record}.{field}' is malformed: {message}")]
    MalformedField {
        record: String,
        field: String,
        message: Cow<'static, str>,
    },
}

/// Failure reported by (or on behalf of) an output sink.
#[derive(Debug, Clone, Error)]
pub enum SinkError {
    /// The underlying stream failed.
    #[error("i/o error: {0}")]
    Io(Arc<io::Error>),

    /// Write attempted after the sink was closed.
    #[error("sink is closed")]
    Closed,

    /// An earlier write on this shared sink failed; the stream position can no longer be trusted.
    #[error("sink unusable after earlier failure: {cause}")]
    Poisoned { cause: String },
}

impl From<io::Error> for SinkError {
    fn from(err: io::Error) -> Self {
        SinkError::Io(Arc::new(err))
    }
}

/// Renderer was handed an operation it cannot express.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// The operation carries nothing to render (for example an empty field patch).
    #[error("cannot render {kind} for '{record}': {reason}")]
    Unsupported {
        kind: &'static str,
        record: String,
        reason: Cow<'static, str>,
    },

    /// A value could not be encoded as a script literal.
    #[error("failed to encode value for '{record}': {message}")]
    Encode { record: String, message: String },
}

/// Failed result for a single content type in a run.
#[derive(Debug, Clone, Error)]
pub enum RunError {
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// The run was aborted by a fatal error on another content type.
    #[error("run aborted: {cause}")]
    Aborted { cause: String },
}

impl RunError {
    /// Render errors indicate a mismatch between diff and renderer and end the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RunError::Render(_))
    }
}

/// Failure reading a snapshot file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read snapshot {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid snapshot {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
