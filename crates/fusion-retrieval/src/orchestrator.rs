//! Multi-source query orchestration.
//!
//! Owns one optional [`ModalitySearcher`] per collection, constructed at
//! startup and read-only thereafter. Queries fan out over
//! `spawn_blocking` (index scans are CPU-bound), then candidates are
//! merged: placement priority, ascending distance, stable input order,
//! first-seen dedup, truncate to `top_k`, score, resolve media.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use fusion_embeddings::Embedding;
use fusion_media::MediaResolver;
use fusion_types::{Record, SourceId};
use fusion_vector::{ModalitySearcher, SearchHit, VectorError};
use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::hit::{FusedHit, FusionResponse, MediaOutcome};
use crate::scoring::relevance_score;

/// Fusion tunables.
#[derive(Debug, Clone)]
pub struct FusionConfig {
    /// Hard cap on the cross-modal image `top_k` when answering a text
    /// query, so image evidence never drowns the text hits.
    pub cross_modal_cap: usize,
    /// When true, all frames of one video dedup down to a single hit.
    /// Default keeps distinct frames distinct.
    pub collapse_frames_per_file: bool,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            cross_modal_cap: 3,
            collapse_frames_per_file: false,
        }
    }
}

/// A probe file the caller uploaded alongside an image query. It is a
/// perfect match for itself, so it surfaces as a synthetic zero-distance
/// hit ahead of everything else.
#[derive(Debug, Clone)]
pub struct UploadedProbe {
    /// File name within the query-scoped upload location
    pub file: String,
}

/// Placement classes for image-search merging. Lower sorts first.
const PRIORITY_UPLOAD: u8 = 0;
const PRIORITY_STATIC: u8 = 1;
const PRIORITY_VIDEO: u8 = 2;

/// Pre-merge candidate from one source.
struct Candidate {
    record: Record,
    source: SourceId,
    raw_distance: f32,
    priority: u8,
}

/// Fans queries out to the available collections and fuses the results.
#[derive(Default)]
pub struct FusionOrchestrator {
    text: Option<Arc<ModalitySearcher>>,
    static_images: Option<Arc<ModalitySearcher>>,
    video_frames: Option<Arc<ModalitySearcher>>,
    resolver: Option<Arc<MediaResolver>>,
    /// Sources that failed to load and should be reported as skipped
    unavailable: Vec<SourceId>,
    config: FusionConfig,
}

impl FusionOrchestrator {
    pub fn new(config: FusionConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn with_text(mut self, searcher: ModalitySearcher) -> Self {
        self.text = Some(Arc::new(searcher));
        self
    }

    pub fn with_static_images(mut self, searcher: ModalitySearcher) -> Self {
        self.static_images = Some(Arc::new(searcher));
        self
    }

    pub fn with_video_frames(mut self, searcher: ModalitySearcher) -> Self {
        self.video_frames = Some(Arc::new(searcher));
        self
    }

    pub fn with_media(mut self, resolver: MediaResolver) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    /// Load the persisted collections found under `dir`, by convention
    /// at the bases `text`, `static_images`, and `video_frames`.
    ///
    /// A collection that fails to load is logged and marked unavailable;
    /// startup proceeds with whatever survives.
    pub fn load(dir: &Path, config: FusionConfig) -> Self {
        let mut unavailable = Vec::new();
        let text = try_load(SourceId::Text, &dir.join("text"), &mut unavailable);
        let static_images = try_load(
            SourceId::StaticImages,
            &dir.join("static_images"),
            &mut unavailable,
        );
        let video_frames = try_load(
            SourceId::VideoFrames,
            &dir.join("video_frames"),
            &mut unavailable,
        );
        Self {
            text,
            static_images,
            video_frames,
            resolver: None,
            unavailable,
            config,
        }
    }

    /// Answer a text query, optionally with cross-modal image evidence.
    ///
    /// `cross_modal` is the same query embedded in the image collections'
    /// space; when present, the image collections are consulted with a
    /// deliberately smaller `top_k`. Results merge on ascending distance.
    pub async fn search_text(
        &self,
        query: &Embedding,
        cross_modal: Option<&Embedding>,
        top_k: usize,
    ) -> FusionResponse {
        let mut skipped = Vec::new();
        let mut jobs = Vec::new();

        match &self.text {
            Some(searcher) => jobs.push((SourceId::Text, 0, spawn_search(searcher, query, top_k))),
            None => self.note_unavailable(SourceId::Text, &mut skipped),
        }

        if let Some(cross) = cross_modal {
            let k = self.cross_modal_top_k(top_k);
            match &self.static_images {
                Some(searcher) => {
                    jobs.push((SourceId::StaticImages, 0, spawn_search(searcher, cross, k)))
                }
                None => self.note_unavailable(SourceId::StaticImages, &mut skipped),
            }
            match &self.video_frames {
                Some(searcher) => {
                    jobs.push((SourceId::VideoFrames, 0, spawn_search(searcher, cross, k)))
                }
                None => self.note_unavailable(SourceId::VideoFrames, &mut skipped),
            }
        }

        let candidates = collect(jobs, &mut skipped).await;
        self.fuse(candidates, top_k, skipped).await
    }

    /// Answer an image query over both image collections.
    ///
    /// Static-image hits take placement priority over video-frame hits,
    /// and a caller-supplied uploaded probe becomes a synthetic
    /// zero-distance hit ahead of everything (deduplicating any indexed
    /// entry with the same file name).
    pub async fn search_image(
        &self,
        query: &Embedding,
        uploaded: Option<UploadedProbe>,
        top_k: usize,
    ) -> FusionResponse {
        let mut skipped = Vec::new();
        let mut jobs = Vec::new();

        match &self.static_images {
            Some(searcher) => jobs.push((
                SourceId::StaticImages,
                PRIORITY_STATIC,
                spawn_search(searcher, query, top_k),
            )),
            None => self.note_unavailable(SourceId::StaticImages, &mut skipped),
        }
        match &self.video_frames {
            Some(searcher) => jobs.push((
                SourceId::VideoFrames,
                PRIORITY_VIDEO,
                spawn_search(searcher, query, top_k),
            )),
            None => self.note_unavailable(SourceId::VideoFrames, &mut skipped),
        }

        let mut candidates = collect(jobs, &mut skipped).await;

        if let Some(probe) = uploaded {
            candidates.push(Candidate {
                record: Record::Uploaded { file: probe.file },
                source: SourceId::Upload,
                raw_distance: 0.0,
                priority: PRIORITY_UPLOAD,
            });
        }

        self.fuse(candidates, top_k, skipped).await
    }

    /// Image `top_k` used for cross-modal evidence on a text query:
    /// half the text `top_k`, at least 1, capped by configuration.
    fn cross_modal_top_k(&self, top_k: usize) -> usize {
        (top_k / 2).max(1).min(self.config.cross_modal_cap)
    }

    fn note_unavailable(&self, source: SourceId, skipped: &mut Vec<SourceId>) {
        if self.unavailable.contains(&source) {
            skipped.push(source);
        }
    }

    /// Merge candidates: sort by (priority, distance, input order),
    /// dedup first-seen by record key, truncate, score by final rank,
    /// and resolve media.
    async fn fuse(
        &self,
        mut candidates: Vec<Candidate>,
        top_k: usize,
        skipped_sources: Vec<SourceId>,
    ) -> FusionResponse {
        candidates.sort_by(|a, b| {
            a.priority.cmp(&b.priority).then(
                a.raw_distance
                    .partial_cmp(&b.raw_distance)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
        });

        let mut seen = HashSet::new();
        let mut survivors = Vec::new();
        for candidate in candidates {
            if survivors.len() == top_k {
                break;
            }
            if seen.insert(self.merge_key(&candidate.record)) {
                survivors.push(candidate);
            }
        }

        let mut hits: Vec<FusedHit> = survivors
            .into_iter()
            .enumerate()
            .map(|(rank, c)| FusedHit {
                score: relevance_score(c.raw_distance, rank, top_k),
                record: c.record,
                source: c.source,
                raw_distance: c.raw_distance,
                media: None,
            })
            .collect();

        self.attach_media(&mut hits).await;
        FusionResponse {
            hits,
            skipped_sources,
        }
    }

    /// Deduplication key: still images and uploads by file name, video
    /// frames by file + frame (or file alone when collapsing), text
    /// lines by file + line.
    fn merge_key(&self, record: &Record) -> String {
        if self.config.collapse_frames_per_file
            && matches!(record, Record::VideoFrame { .. })
        {
            record.file().to_string()
        } else {
            record.dedup_key()
        }
    }

    /// Resolve media for each hit that has any. A failed resolution
    /// degrades that one entry (ranking kept, media marked unreadable);
    /// it never fails the query.
    async fn attach_media(&self, hits: &mut [FusedHit]) {
        let Some(resolver) = &self.resolver else {
            return;
        };

        let mut indices = Vec::new();
        let mut handles = Vec::new();
        for (i, hit) in hits.iter().enumerate() {
            if matches!(hit.record, Record::TextLine { .. }) {
                continue;
            }
            let resolver = Arc::clone(resolver);
            let record = hit.record.clone();
            indices.push(i);
            handles.push(tokio::task::spawn_blocking(move || {
                resolver.resolve(&record)
            }));
        }

        for (i, joined) in indices.into_iter().zip(join_all(handles).await) {
            let outcome = match joined {
                Ok(Ok(Some(bytes))) => Some(MediaOutcome::Resolved { bytes }),
                Ok(Ok(None)) => None,
                Ok(Err(e)) => {
                    warn!(file = hits[i].record.file(), error = %e, "media resolution failed");
                    Some(MediaOutcome::Unreadable {
                        reason: e.to_string(),
                    })
                }
                Err(e) => Some(MediaOutcome::Unreadable {
                    reason: format!("resolution task failed: {}", e),
                }),
            };
            hits[i].media = outcome;
        }
    }
}

fn try_load(
    source: SourceId,
    base: &Path,
    unavailable: &mut Vec<SourceId>,
) -> Option<Arc<ModalitySearcher>> {
    match ModalitySearcher::load(source.as_str(), base) {
        Ok(searcher) => {
            info!(
                source = source.as_str(),
                vectors = searcher.len(),
                "collection loaded"
            );
            Some(Arc::new(searcher))
        }
        Err(e) => {
            warn!(
                source = source.as_str(),
                error = %e,
                "collection unavailable; queries will degrade"
            );
            unavailable.push(source);
            None
        }
    }
}

fn spawn_search(
    searcher: &Arc<ModalitySearcher>,
    query: &Embedding,
    top_k: usize,
) -> JoinHandle<Result<Vec<SearchHit>, VectorError>> {
    let searcher = Arc::clone(searcher);
    let query = query.clone();
    tokio::task::spawn_blocking(move || searcher.search(&query, top_k))
}

/// Await every source job; a failed source is logged and reported as
/// skipped, never fatal to the query.
async fn collect(
    jobs: Vec<(SourceId, u8, JoinHandle<Result<Vec<SearchHit>, VectorError>>)>,
    skipped: &mut Vec<SourceId>,
) -> Vec<Candidate> {
    let mut meta = Vec::with_capacity(jobs.len());
    let mut handles = Vec::with_capacity(jobs.len());
    for (source, priority, handle) in jobs {
        meta.push((source, priority));
        handles.push(handle);
    }

    let mut candidates = Vec::new();
    for ((source, priority), joined) in meta.into_iter().zip(join_all(handles).await) {
        match joined {
            Ok(Ok(hits)) => candidates.extend(hits.into_iter().map(|hit| Candidate {
                record: hit.record,
                source,
                raw_distance: hit.raw_distance,
                priority,
            })),
            Ok(Err(e)) => {
                warn!(source = source.as_str(), error = %e, "source failed; continuing without it");
                skipped.push(source);
            }
            Err(e) => {
                warn!(source = source.as_str(), error = %e, "source task failed; continuing without it");
                skipped.push(source);
            }
        }
    }
    candidates
}
