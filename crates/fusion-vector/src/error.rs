//! Vector index and collection error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during vector and collection operations.
#[derive(Debug, Error)]
pub enum VectorError {
    /// Vector length does not match the index dimension.
    /// Vectors are never truncated or padded.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Vector contains NaN or infinite values
    #[error("invalid vector: {0}")]
    InvalidVector(String),

    /// Structural parameters are unusable
    #[error("invalid index configuration: {0}")]
    Config(String),

    /// Approximate index used before training
    #[error("index is not trained; train before adding or searching")]
    NotTrained,

    /// Metadata id beyond store length. Signals index/metadata
    /// desynchronization, a build-time bug rather than a transient fault.
    #[error("record id {id} out of range (store holds {len} records)")]
    OutOfRange { id: usize, len: usize },

    /// Persisted artifacts disagree on load
    #[error("corrupted collection: index holds {vectors} vectors, metadata holds {records} records")]
    CorruptedIndex { vectors: usize, records: usize },

    /// One half of a persisted artifact pair is absent
    #[error("missing collection artifact: {0}")]
    MissingArtifact(PathBuf),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}
