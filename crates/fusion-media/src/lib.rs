//! Media byte resolution.
//!
//! Turns a hit's [`Record`](fusion_types::Record) into displayable bytes:
//! plain file reads for images and uploads, and video frame extraction
//! with a bounded fallback sequence for frame records. Text records carry
//! their own content and resolve to nothing here.

mod error;
mod resolver;

pub use error::MediaError;
pub use resolver::{
    frame_candidates, FfmpegExtractor, FrameExtractor, MediaResolver, MAX_FRAME_ATTEMPTS,
};
