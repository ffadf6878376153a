//! Query-time fusion across modality collections.
//!
//! The [`FusionOrchestrator`] fans a query out to the available
//! [`ModalitySearcher`](fusion_vector::ModalitySearcher)s in parallel,
//! merges the per-source candidates with deduplication and placement
//! priority, scores the survivors, and resolves their media payloads.
//! A source that is down degrades the result set; it never fails the
//! query.

mod hit;
mod orchestrator;
mod scoring;

pub use hit::{FusedHit, FusionResponse, MediaOutcome};
pub use orchestrator::{FusionConfig, FusionOrchestrator, UploadedProbe};
pub use scoring::relevance_score;
