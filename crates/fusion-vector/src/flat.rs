//! Exact flat index.
//!
//! Append-only row-major buffer with full-scan search. O(n · d) per query
//! but exact, and the right choice for small collections. Needs no
//! training.

use bincode::{Decode, Encode};

use crate::metric::Metric;

/// Exact nearest-neighbor index over a dense flat buffer.
///
/// Vectors are stored already prepared for the metric (unit-normalized
/// under cosine). Ids are implicit: the i-th stored row has id `i`.
#[derive(Debug, Clone, Encode, Decode)]
pub struct FlatIndex {
    dimension: usize,
    metric: Metric,
    /// Row-major vector data, len == count * dimension
    data: Vec<f32>,
}

impl FlatIndex {
    pub fn new(dimension: usize, metric: Metric) -> Self {
        Self {
            dimension,
            metric,
            data: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn len(&self) -> usize {
        self.data.len() / self.dimension
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.dimension..(i + 1) * self.dimension]
    }

    /// Append a prepared vector; the caller has already validated length
    /// and finiteness and applied metric preparation.
    pub(crate) fn push_prepared(&mut self, values: &[f32]) {
        debug_assert_eq!(values.len(), self.dimension);
        self.data.extend_from_slice(values);
    }

    /// Scan all rows and return up to `top_k` (id, distance) pairs,
    /// ascending by distance.
    pub(crate) fn search_prepared(&self, query: &[f32], top_k: usize) -> Vec<(usize, f32)> {
        if top_k == 0 || self.is_empty() {
            return Vec::new();
        }

        let mut results: Vec<(usize, f32)> = (0..self.len())
            .map(|i| (i, self.metric.distance(query, self.row(i))))
            .collect();

        results.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        results.truncate(top_k);
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::l2_normalize;

    #[test]
    fn test_search_orders_by_distance() {
        let mut index = FlatIndex::new(3, Metric::Euclidean);
        index.push_prepared(&[0.0, 0.0, 0.0]);
        index.push_prepared(&[1.0, 1.0, 1.0]);
        index.push_prepared(&[10.0, 10.0, 10.0]);

        let results = index.search_prepared(&[0.0, 0.0, 0.0], 3);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].0, 0);
        assert!(results[0].1 < 0.001);
        assert_eq!(results[1].0, 1);
        assert_eq!(results[2].0, 2);
    }

    #[test]
    fn test_top_k_truncation_and_small_index() {
        let mut index = FlatIndex::new(2, Metric::Euclidean);
        index.push_prepared(&[0.0, 0.0]);
        index.push_prepared(&[1.0, 0.0]);

        // more requested than stored: returns what exists
        let results = index.search_prepared(&[0.0, 0.0], 10);
        assert_eq!(results.len(), 2);

        let results = index.search_prepared(&[0.0, 0.0], 1);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, 0);
    }

    #[test]
    fn test_k_zero_and_empty() {
        let mut index = FlatIndex::new(2, Metric::Euclidean);
        assert!(index.search_prepared(&[0.0, 0.0], 5).is_empty());
        index.push_prepared(&[1.0, 2.0]);
        assert!(index.search_prepared(&[0.0, 0.0], 0).is_empty());
    }

    #[test]
    fn test_cosine_rows_prepared() {
        let mut index = FlatIndex::new(2, Metric::Cosine);
        index.push_prepared(&l2_normalize(&[1.0, 0.0]));
        index.push_prepared(&l2_normalize(&[0.0, 1.0]));
        index.push_prepared(&l2_normalize(&[-1.0, 0.0]));

        let q = l2_normalize(&[1.0, 0.0]);
        let results = index.search_prepared(&q, 3);

        assert_eq!(results[0].0, 0);
        assert!(results[0].1.abs() < 0.001); // same direction: distance 0
        assert_eq!(results[1].0, 1);
        assert!((results[1].1 - 1.0).abs() < 0.001); // orthogonal: 1
        assert_eq!(results[2].0, 2);
        assert!((results[2].1 - 2.0).abs() < 0.001); // opposite: 2
    }
}
