//! # fusion-types
//!
//! Shared domain types for the media-fusion retrieval engine.
//!
//! A stored vector is described by a [`Record`]: which file it came from,
//! and the line, frame, or upload it represents. Records are written once
//! during the offline build and identified by their positional id in a
//! collection, so they carry no id of their own.

pub mod record;
pub mod source;

pub use record::{MediaKind, Record};
pub use source::SourceId;
