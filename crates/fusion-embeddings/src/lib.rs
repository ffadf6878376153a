//! # fusion-embeddings
//!
//! The [`Embedding`] value type and the contracts for the external
//! pretrained encoders that produce embeddings.
//!
//! The encoders themselves (text, image, audio models) live outside this
//! workspace and are treated as black boxes: given a decoded input they
//! return a fixed-dimension `f32` vector. This crate only defines that
//! contract and validates what comes back — a wrong-length or
//! non-finite vector is rejected before it can reach an index.

pub mod error;
pub mod model;

pub use error::EncodingError;
pub use model::{Embedding, MediaEncoder, TextEncoder};
