//! Embedding value type and encoder traits.

use crate::error::EncodingError;

/// A dense embedding vector.
///
/// Values are stored exactly as the encoder produced them; normalization
/// is a metric concern and is applied by the index that stores the vector,
/// not here.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    /// The embedding vector
    pub values: Vec<f32>,
}

impl Embedding {
    /// Create a new embedding from raw values.
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// Create an embedding, rejecting non-finite values.
    pub fn checked(values: Vec<f32>) -> Result<Self, EncodingError> {
        for (i, &v) in values.iter().enumerate() {
            if !v.is_finite() {
                return Err(EncodingError::InvalidEmbedding(format!(
                    "non-finite value {} at index {}",
                    v, i
                )));
            }
        }
        Ok(Self { values })
    }

    /// Get the embedding dimension
    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    /// Return a copy scaled to unit L2 length.
    /// A zero vector is returned unchanged.
    pub fn l2_normalized(&self) -> Embedding {
        let norm: f32 = self.values.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            Embedding::new(self.values.iter().map(|x| x / norm).collect())
        } else {
            self.clone()
        }
    }

    /// Compute cosine similarity with another embedding.
    /// Returns value in [-1, 1] range (1 = identical direction).
    pub fn cosine_similarity(&self, other: &Embedding) -> f32 {
        if self.values.len() != other.values.len() {
            return 0.0;
        }
        let a = self.l2_normalized();
        let b = other.l2_normalized();
        a.values
            .iter()
            .zip(b.values.iter())
            .map(|(x, y)| x * y)
            .sum()
    }
}

/// Contract for external text encoders.
///
/// Implementations must be deterministic for identical input and
/// thread-safe (Send + Sync) for concurrent use.
pub trait TextEncoder: Send + Sync {
    /// The dimension of every vector this encoder produces.
    fn dimension(&self) -> usize;

    /// Encode a text into an embedding.
    fn encode(&self, text: &str) -> Result<Embedding, EncodingError>;

    /// Encode and validate: rejects wrong-length or non-finite output
    /// so a malformed vector never reaches an index or a search.
    fn encode_checked(&self, text: &str) -> Result<Embedding, EncodingError> {
        let embedding = self.encode(text)?;
        validate_output(embedding, self.dimension())
    }
}

/// Contract for external image/audio encoders operating on decoded bytes.
pub trait MediaEncoder: Send + Sync {
    /// The dimension of every vector this encoder produces.
    fn dimension(&self) -> usize;

    /// Encode a decoded media payload into an embedding.
    fn encode(&self, bytes: &[u8]) -> Result<Embedding, EncodingError>;

    /// Encode and validate, as [`TextEncoder::encode_checked`].
    fn encode_checked(&self, bytes: &[u8]) -> Result<Embedding, EncodingError> {
        let embedding = self.encode(bytes)?;
        validate_output(embedding, self.dimension())
    }
}

fn validate_output(embedding: Embedding, expected: usize) -> Result<Embedding, EncodingError> {
    if embedding.dimension() != expected {
        return Err(EncodingError::InvalidEmbedding(format!(
            "encoder returned {} values, expected {}",
            embedding.dimension(),
            expected
        )));
    }
    Embedding::checked(embedding.values)
}
