//! One queryable collection: a vector index paired with its record store.
//!
//! Persisted as two artifacts sharing a base path: `<base>.index`
//! (bincode, the full index structure including trained quantizer state)
//! and `<base>.meta.json` (the ordered record array). The pairing is by
//! convention; loading one without the other is a configuration error.

use std::path::{Path, PathBuf};

use fusion_embeddings::Embedding;
use fusion_types::Record;
use tracing::{error, info};

use crate::error::VectorError;
use crate::index::VectorIndex;
use crate::metadata::MetadataStore;
use crate::metric::Metric;

/// A search hit joining a vector id to its record.
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// Dense vector id within the collection
    pub id: usize,
    /// The record behind the vector
    pub record: Record,
    /// Raw distance under the collection's metric
    pub raw_distance: f32,
}

/// One named collection: index + metadata, kept in lockstep.
///
/// After [`ModalitySearcher::load`] the searcher is read-only; `search`
/// takes `&self` and the searcher can be shared behind an `Arc` by any
/// number of concurrent readers.
#[derive(Debug)]
pub struct ModalitySearcher {
    name: String,
    index: VectorIndex,
    metadata: MetadataStore,
}

impl ModalitySearcher {
    /// Create an empty collection around a fresh index.
    pub fn new(name: impl Into<String>, index: VectorIndex) -> Self {
        Self {
            name: name.into(),
            index,
            metadata: MetadataStore::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    pub fn metric(&self) -> Metric {
        self.index.metric()
    }

    /// Train the underlying index (no-op for exact indexes).
    pub fn train(&mut self, sample: &[Embedding]) -> Result<(), VectorError> {
        self.index.train(sample)
    }

    /// Append one (vector, record) pair, preserving the id-density
    /// invariant: vector count and metadata length stay equal.
    pub fn add(&mut self, embedding: &Embedding, record: Record) -> Result<usize, VectorError> {
        let id = self.index.add(embedding)?;
        self.metadata.append(record);
        debug_assert_eq!(self.index.len(), self.metadata.len());
        Ok(id)
    }

    /// Search the collection and join ids to records.
    ///
    /// An id the metadata cannot resolve means the index and the store
    /// have desynchronized; that is a fatal consistency error for this
    /// collection and aborts its contribution, loudly.
    pub fn search(&self, query: &Embedding, top_k: usize) -> Result<Vec<SearchHit>, VectorError> {
        let candidates = self.index.search(query, top_k)?;
        let mut hits = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            match self.metadata.get(candidate.id) {
                Ok(record) => hits.push(SearchHit {
                    id: candidate.id,
                    record: record.clone(),
                    raw_distance: candidate.distance,
                }),
                Err(e) => {
                    error!(
                        collection = %self.name,
                        id = candidate.id,
                        records = self.metadata.len(),
                        "index returned id with no metadata record; collection is corrupted"
                    );
                    return Err(e);
                }
            }
        }
        Ok(hits)
    }

    /// Write both artifacts for this collection.
    pub fn persist(&self, base: &Path) -> Result<(), VectorError> {
        if let Some(parent) = base.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(index_path(base), self.index.to_bytes()?)?;
        self.metadata.save(&meta_path(base))?;
        info!(
            collection = %self.name,
            base = ?base,
            vectors = self.index.len(),
            "persisted collection"
        );
        Ok(())
    }

    /// Load a persisted collection.
    ///
    /// Fails with [`VectorError::MissingArtifact`] when half the pair is
    /// absent and with [`VectorError::CorruptedIndex`] when the two
    /// artifacts disagree on length. Neither is repaired silently.
    pub fn load(name: impl Into<String>, base: &Path) -> Result<Self, VectorError> {
        let name = name.into();
        let index_file = index_path(base);
        let meta_file = meta_path(base);

        if !index_file.exists() {
            return Err(VectorError::MissingArtifact(index_file));
        }
        if !meta_file.exists() {
            return Err(VectorError::MissingArtifact(meta_file));
        }

        let index = VectorIndex::from_bytes(&std::fs::read(&index_file)?)?;
        let metadata = MetadataStore::load(&meta_file)?;

        if index.len() != metadata.len() {
            error!(
                collection = %name,
                vectors = index.len(),
                records = metadata.len(),
                "persisted artifacts disagree"
            );
            return Err(VectorError::CorruptedIndex {
                vectors: index.len(),
                records: metadata.len(),
            });
        }

        info!(collection = %name, vectors = index.len(), "loaded collection");
        Ok(Self {
            name,
            index,
            metadata,
        })
    }
}

fn index_path(base: &Path) -> PathBuf {
    artifact(base, ".index")
}

fn meta_path(base: &Path) -> PathBuf {
    artifact(base, ".meta.json")
}

fn artifact(base: &Path, suffix: &str) -> PathBuf {
    let mut s = base.as_os_str().to_os_string();
    s.push(suffix);
    PathBuf::from(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn emb(values: &[f32]) -> Embedding {
        Embedding::new(values.to_vec())
    }

    fn image(file: &str) -> Record {
        Record::StaticImage {
            file: file.to_string(),
        }
    }

    fn populated() -> ModalitySearcher {
        let mut searcher =
            ModalitySearcher::new("static_images", VectorIndex::exact(2, Metric::Cosine));
        searcher.add(&emb(&[1.0, 0.0]), image("a.jpg")).unwrap();
        searcher.add(&emb(&[0.0, 1.0]), image("b.jpg")).unwrap();
        searcher.add(&emb(&[0.7, 0.7]), image("c.jpg")).unwrap();
        searcher
    }

    #[test]
    fn test_add_keeps_counts_in_lockstep() {
        let searcher = populated();
        assert_eq!(searcher.len(), 3);
    }

    #[test]
    fn test_search_joins_records() {
        let searcher = populated();
        let hits = searcher.search(&emb(&[1.0, 0.1]), 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].record, image("a.jpg"));
        assert!(hits[0].raw_distance < hits[1].raw_distance);
    }

    #[test]
    fn test_persist_and_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().join("static_images");

        let searcher = populated();
        searcher.persist(&base).unwrap();

        let loaded = ModalitySearcher::load("static_images", &base).unwrap();
        assert_eq!(loaded.len(), 3);

        let before = searcher.search(&emb(&[0.6, 0.8]), 3).unwrap();
        let after = loaded.search(&emb(&[0.6, 0.8]), 3).unwrap();
        for (a, b) in before.iter().zip(after.iter()) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.record, b.record);
            assert!((a.raw_distance - b.raw_distance).abs() < 1e-6);
        }
    }

    #[test]
    fn test_load_missing_half_of_pair() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().join("static_images");

        populated().persist(&base).unwrap();
        std::fs::remove_file(temp.path().join("static_images.meta.json")).unwrap();

        let err = ModalitySearcher::load("static_images", &base).unwrap_err();
        assert!(matches!(err, VectorError::MissingArtifact(_)));
    }

    #[test]
    fn test_load_detects_length_mismatch() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().join("static_images");

        populated().persist(&base).unwrap();

        // overwrite the metadata artifact with fewer records
        let mut shorter = MetadataStore::new();
        shorter.append(image("a.jpg"));
        shorter
            .save(&temp.path().join("static_images.meta.json"))
            .unwrap();

        let err = ModalitySearcher::load("static_images", &base).unwrap_err();
        assert!(matches!(
            err,
            VectorError::CorruptedIndex {
                vectors: 3,
                records: 1
            }
        ));
    }
}
