//! # fusion-vector
//!
//! Per-modality vector indexes for the media-fusion engine.
//!
//! Each collection ("text", "static_images", "video_frames") is one
//! [`ModalitySearcher`]: a [`VectorIndex`] holding the embeddings and a
//! [`MetadataStore`] holding one [`Record`](fusion_types::Record) per
//! vector, in insertion order. Ids are dense `[0, len)` positions and the
//! two halves must always agree in length.
//!
//! ## Features
//! - Exact flat index (full scan) and IVF+PQ approximate index with an
//!   explicit train-before-insert lifecycle
//! - Euclidean and cosine metric modes, fixed per index and persisted
//! - Paired persistence: one bincode index artifact, one JSON metadata
//!   artifact, consistency-checked on load
//! - One-shot offline [`CollectionBuilder`] streaming (embedding, record)
//!   pairs
//!
//! The build phase is single-writer; once persisted, a loaded searcher is
//! read-only and safe to share across concurrent readers.

pub mod builder;
pub mod collection;
pub mod error;
pub mod flat;
pub mod index;
pub mod ivfpq;
pub mod metadata;
pub mod metric;

pub use builder::{BuildStats, CollectionBuilder};
pub use collection::{ModalitySearcher, SearchHit};
pub use error::VectorError;
pub use flat::FlatIndex;
pub use index::{SearchResult, VectorIndex};
pub use ivfpq::{IvfPqConfig, IvfPqIndex};
pub use metadata::MetadataStore;
pub use metric::Metric;
