//! Encoder boundary error types.

use thiserror::Error;

/// Errors crossing the encoder boundary.
#[derive(Debug, Error)]
pub enum EncodingError {
    /// The external encoder failed to produce a vector.
    #[error("encoder failed: {0}")]
    EncodingFailed(String),

    /// The encoder returned a malformed vector (wrong length, NaN, infinity).
    #[error("invalid embedding: {0}")]
    InvalidEmbedding(String),
}
