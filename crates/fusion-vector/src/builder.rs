//! Offline collection build.
//!
//! Buffers (vector, record) pairs, trains the index on the full set when
//! training is needed, then inserts in buffered order so ids match the
//! record sequence. The one-shot shape exists because approximate indexes
//! must see a representative sample before any insert.

use std::path::Path;
use std::time::Instant;

use fusion_embeddings::Embedding;
use fusion_types::Record;
use tracing::info;

use crate::collection::ModalitySearcher;
use crate::error::VectorError;
use crate::index::VectorIndex;

/// Summary of one collection build.
#[derive(Debug, Clone)]
pub struct BuildStats {
    /// Vectors inserted
    pub vectors: usize,
    /// Whether a training pass ran
    pub trained: bool,
    /// Wall-clock build time in milliseconds
    pub elapsed_ms: u128,
}

/// Accumulates a collection's content, then builds it in one pass.
pub struct CollectionBuilder {
    name: String,
    index: VectorIndex,
    embeddings: Vec<Embedding>,
    records: Vec<Record>,
}

impl CollectionBuilder {
    pub fn new(name: impl Into<String>, index: VectorIndex) -> Self {
        Self {
            name: name.into(),
            index,
            embeddings: Vec::new(),
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Buffer one pair. Validation happens here so a bad vector fails the
    /// build at its source instead of mid-insert after training.
    pub fn push(&mut self, embedding: Embedding, record: Record) -> Result<(), VectorError> {
        self.index.validate(&embedding)?;
        self.embeddings.push(embedding);
        self.records.push(record);
        Ok(())
    }

    /// Train (if the index needs it), insert everything in order, and
    /// return the finished searcher with build statistics.
    pub fn build(mut self) -> Result<(ModalitySearcher, BuildStats), VectorError> {
        let start = Instant::now();
        let trained = self.index.requires_training();

        if trained {
            self.index.train(&self.embeddings)?;
        }

        let mut searcher = ModalitySearcher::new(self.name, self.index);
        for (embedding, record) in self.embeddings.iter().zip(self.records) {
            searcher.add(embedding, record)?;
        }

        let stats = BuildStats {
            vectors: searcher.len(),
            trained,
            elapsed_ms: start.elapsed().as_millis(),
        };
        info!(
            collection = searcher.name(),
            vectors = stats.vectors,
            trained = stats.trained,
            elapsed_ms = stats.elapsed_ms,
            "built collection"
        );
        Ok((searcher, stats))
    }

    /// Build and immediately persist under `base`.
    pub fn build_and_persist(
        self,
        base: &Path,
    ) -> Result<(ModalitySearcher, BuildStats), VectorError> {
        let (searcher, stats) = self.build()?;
        searcher.persist(base)?;
        Ok((searcher, stats))
    }
}
