use thiserror::Error;

use crate::document::AccessorUsage;

/// Errors raised by the document core and the glTF reader/writer.
///
/// Format errors abort the current read or write and are never retried.
/// Contract violations (graph mismatch, stale ids, usage conflicts) indicate
/// a programming error in the caller rather than bad input.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unsupported glTF version {0:?}, expected \"2.0\"")]
    UnsupportedVersion(String),

    #[error("asset requires unsupported extension {0:?}")]
    MissingRequiredExtension(String),

    #[error("cannot connect properties that belong to different documents")]
    GraphMismatch,

    #[error("property was disposed and can no longer be used")]
    StaleProperty,

    #[error("accessor is referenced under incompatible usages ({0:?} and {1:?})")]
    UsageConflict(AccessorUsage, AccessorUsage),

    #[error("missing resource {0:?}")]
    MissingResource(String),

    #[error("the binary container supports a single buffer, found {0}")]
    MultipleBuffers(usize),

    #[error("malformed asset: {0}")]
    Malformed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
