//! Fused result shapes returned to the serving boundary.

use fusion_types::{Record, SourceId};
use serde::Serialize;

/// Outcome of resolving a hit's media payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MediaOutcome {
    /// Raw media bytes, ready for boundary-layer encoding
    Resolved { bytes: Vec<u8> },
    /// Resolution failed; the hit keeps its ranking without media
    Unreadable { reason: String },
}

/// One scored entry of a fused result list.
#[derive(Debug, Clone, Serialize)]
pub struct FusedHit {
    pub record: Record,
    /// Collection (or synthetic source) that produced the hit
    pub source: SourceId,
    /// Canonical relevance signal, ascending = more similar
    pub raw_distance: f32,
    /// Derived 0-100 display score
    pub score: f32,
    /// Resolved media, if the record has any and a resolver is attached
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaOutcome>,
}

/// A complete query response: ordered hits plus degradation notes.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FusionResponse {
    pub hits: Vec<FusedHit>,
    /// Sources that could not contribute to this query
    pub skipped_sources: Vec<SourceId>,
}
