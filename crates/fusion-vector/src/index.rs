//! Unified vector index facade.
//!
//! Wraps the exact and IVF+PQ structures behind one API that owns the
//! shared contract: dimension and finiteness validation on every vector,
//! metric preparation (normalization under cosine), dense ids, and
//! versioned binary persistence.

use bincode::{Decode, Encode};
use fusion_embeddings::Embedding;
use tracing::debug;

use crate::error::VectorError;
use crate::flat::FlatIndex;
use crate::ivfpq::{IvfPqConfig, IvfPqIndex};
use crate::metric::Metric;

/// One search candidate: a dense id and its raw distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchResult {
    /// Positional id, shared with the collection's metadata store
    pub id: usize,
    /// Raw distance under the index metric (ascending = more similar)
    pub distance: f32,
}

/// A vector index for one embedding space.
///
/// Append-only: the first added vector receives id 0, the next id 1, and
/// so on, matching the order records are appended to the paired
/// [`MetadataStore`](crate::MetadataStore). No deletion or reordering.
#[derive(Debug, Clone, Encode, Decode)]
pub enum VectorIndex {
    /// Exact full-scan index
    Flat(FlatIndex),
    /// Approximate inverted-file index with PQ codes
    IvfPq(IvfPqIndex),
}

const INDEX_FORMAT_VERSION: u32 = 1;

/// On-disk envelope for a persisted index.
#[derive(Encode, Decode)]
struct PersistedIndex {
    version: u32,
    index: VectorIndex,
}

impl VectorIndex {
    /// Create an exact index. Needs no training.
    pub fn exact(dimension: usize, metric: Metric) -> Self {
        VectorIndex::Flat(FlatIndex::new(dimension, metric))
    }

    /// Create an approximate IVF+PQ index. Starts untrained.
    pub fn approximate(
        dimension: usize,
        metric: Metric,
        config: IvfPqConfig,
    ) -> Result<Self, VectorError> {
        Ok(VectorIndex::IvfPq(IvfPqIndex::new(
            dimension, metric, config,
        )?))
    }

    pub fn dimension(&self) -> usize {
        match self {
            VectorIndex::Flat(i) => i.dimension(),
            VectorIndex::IvfPq(i) => i.dimension(),
        }
    }

    pub fn metric(&self) -> Metric {
        match self {
            VectorIndex::Flat(i) => i.metric(),
            VectorIndex::IvfPq(i) => i.metric(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            VectorIndex::Flat(i) => i.len(),
            VectorIndex::IvfPq(i) => i.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn requires_training(&self) -> bool {
        matches!(self, VectorIndex::IvfPq(_))
    }

    pub fn is_trained(&self) -> bool {
        match self {
            VectorIndex::Flat(_) => true,
            VectorIndex::IvfPq(i) => i.is_trained(),
        }
    }

    /// Reject wrong-length or non-finite vectors. Never truncates or pads.
    pub(crate) fn validate(&self, embedding: &Embedding) -> Result<(), VectorError> {
        if embedding.dimension() != self.dimension() {
            return Err(VectorError::DimensionMismatch {
                expected: self.dimension(),
                actual: embedding.dimension(),
            });
        }
        for (i, &v) in embedding.values.iter().enumerate() {
            if !v.is_finite() {
                return Err(VectorError::InvalidVector(format!(
                    "non-finite value {} at index {}",
                    v, i
                )));
            }
        }
        Ok(())
    }

    /// Train the quantization structures on a representative sample.
    ///
    /// A no-op for exact indexes; idempotent on an already-trained
    /// approximate index.
    pub fn train(&mut self, sample: &[Embedding]) -> Result<(), VectorError> {
        for embedding in sample {
            self.validate(embedding)?;
        }
        match self {
            VectorIndex::Flat(_) => Ok(()),
            VectorIndex::IvfPq(index) => {
                let metric = index.metric();
                let prepared: Vec<Vec<f32>> =
                    sample.iter().map(|e| metric.prepare(&e.values)).collect();
                index.train_prepared(&prepared)
            }
        }
    }

    /// Append one vector, returning its dense id.
    pub fn add(&mut self, embedding: &Embedding) -> Result<usize, VectorError> {
        self.validate(embedding)?;
        let prepared = self.metric().prepare(&embedding.values);
        match self {
            VectorIndex::Flat(index) => {
                let id = index.len();
                index.push_prepared(&prepared);
                Ok(id)
            }
            VectorIndex::IvfPq(index) => index.add_prepared(&prepared),
        }
    }

    /// Append a batch of vectors in order.
    pub fn add_batch(&mut self, embeddings: &[Embedding]) -> Result<(), VectorError> {
        for embedding in embeddings {
            self.add(embedding)?;
        }
        Ok(())
    }

    /// Return up to `top_k` candidates, ascending by raw distance.
    /// Never returns an id at or beyond the current vector count.
    pub fn search(
        &self,
        query: &Embedding,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, VectorError> {
        self.validate(query)?;
        if self.requires_training() && !self.is_trained() {
            return Err(VectorError::NotTrained);
        }
        let prepared = self.metric().prepare(&query.values);
        let raw = match self {
            VectorIndex::Flat(index) => index.search_prepared(&prepared, top_k),
            VectorIndex::IvfPq(index) => index.search_prepared(&prepared, top_k),
        };
        Ok(raw
            .into_iter()
            .map(|(id, distance)| SearchResult { id, distance })
            .collect())
    }

    /// Serialize the full structure, including trained quantizer state.
    pub fn to_bytes(&self) -> Result<Vec<u8>, VectorError> {
        let envelope = PersistedIndex {
            version: INDEX_FORMAT_VERSION,
            index: self.clone(),
        };
        bincode::encode_to_vec(&envelope, bincode::config::standard())
            .map_err(|e| VectorError::Serialization(e.to_string()))
    }

    /// Restore a serialized index.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, VectorError> {
        let (envelope, _): (PersistedIndex, usize) =
            bincode::decode_from_slice(bytes, bincode::config::standard())
                .map_err(|e| VectorError::Serialization(e.to_string()))?;
        if envelope.version != INDEX_FORMAT_VERSION {
            return Err(VectorError::Serialization(format!(
                "unsupported index format version {}",
                envelope.version
            )));
        }
        debug!(
            vectors = envelope.index.len(),
            metric = envelope.index.metric().as_str(),
            "restored vector index"
        );
        Ok(envelope.index)
    }
}
