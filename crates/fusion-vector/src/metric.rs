//! Metric modes and distance primitives.
//!
//! A metric is fixed when an index is created and persisted with it.
//! Cosine mode stores and queries unit-length vectors and reports
//! `1 - cosine_similarity` as the distance, so ascending distance means
//! "more similar first" under both modes.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// Distance metric for one vector index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// True (non-squared) L2 distance over raw vectors
    Euclidean,
    /// `1 - cosine_similarity` over unit-normalized vectors
    Cosine,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Euclidean => "euclidean",
            Metric::Cosine => "cosine",
        }
    }

    /// Prepare a vector for storage or query under this metric.
    pub fn prepare(&self, values: &[f32]) -> Vec<f32> {
        match self {
            Metric::Euclidean => values.to_vec(),
            Metric::Cosine => l2_normalize(values),
        }
    }

    /// Exact distance between two prepared vectors.
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Metric::Euclidean => squared_l2(a, b).sqrt(),
            Metric::Cosine => 1.0 - dot(a, b),
        }
    }

    /// Distance derived from a (possibly approximated) squared L2 between
    /// prepared vectors. For unit vectors `‖a−b‖²/2 == 1 − a·b`, so the
    /// cosine branch lands on the same scale as [`Metric::distance`].
    pub fn distance_from_squared_l2(&self, squared: f32) -> f32 {
        match self {
            Metric::Euclidean => squared.sqrt(),
            Metric::Cosine => squared / 2.0,
        }
    }
}

/// Squared Euclidean distance.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Dot product.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Scale a vector to unit L2 length. A zero vector is returned unchanged.
pub fn l2_normalize(values: &[f32]) -> Vec<f32> {
    let norm: f32 = values.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        values.iter().map(|x| x / norm).collect()
    } else {
        values.to_vec()
    }
}
