//! Insertion-ordered record store.
//!
//! One record per vector id: entry `i` describes the payload behind
//! vector `i`. Append-only; persisted as one JSON array alongside the
//! binary index artifact.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use fusion_types::Record;
use tracing::{debug, info};

use crate::error::VectorError;

/// Append-only ordered sequence of records, parallel to a vector index.
#[derive(Debug, Clone, Default)]
pub struct MetadataStore {
    records: Vec<Record>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append one record, returning its positional id.
    pub fn append(&mut self, record: Record) -> usize {
        self.records.push(record);
        self.records.len() - 1
    }

    /// Append records in order.
    pub fn append_batch(&mut self, records: impl IntoIterator<Item = Record>) {
        self.records.extend(records);
    }

    /// Look up the record for a vector id.
    ///
    /// An out-of-range id is a data-corruption signal (the index and the
    /// store have desynchronized), not a normal miss.
    pub fn get(&self, id: usize) -> Result<&Record, VectorError> {
        self.records.get(id).ok_or(VectorError::OutOfRange {
            id,
            len: self.records.len(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    /// Write the ordered record array as JSON.
    pub fn save(&self, path: &Path) -> Result<(), VectorError> {
        let file = File::create(path)?;
        serde_json::to_writer(BufWriter::new(file), &self.records)
            .map_err(|e| VectorError::Serialization(e.to_string()))?;
        info!(path = ?path, records = self.records.len(), "saved metadata store");
        Ok(())
    }

    /// Load a persisted record array.
    pub fn load(path: &Path) -> Result<Self, VectorError> {
        let file = File::open(path)?;
        let records: Vec<Record> = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| VectorError::Serialization(e.to_string()))?;
        debug!(path = ?path, records = records.len(), "loaded metadata store");
        Ok(Self { records })
    }
}
