//! Inverted-file index with product quantization.
//!
//! Coarse k-means partitioning narrows each search to `nprobe` of the
//! `nlist` inverted lists; product-quantized codes then approximate
//! distances cheaply inside the probed lists:
//!
//! 1. **Partition**: k-means over a training sample yields `nlist` coarse
//!    centroids; every added vector lands in its nearest list.
//! 2. **Compress**: each vector is split into `sub_vectors` subspaces and
//!    each subvector replaced by its nearest codebook centroid id
//!    (`2^bits_per_code` centroids per subspace).
//! 3. **Search**: a per-query distance table (query subvector to every
//!    codebook centroid) makes each code's distance an O(m) lookup sum.
//!
//! The index starts untrained; training must complete before any vector
//! is added.

use bincode::{Decode, Encode};
use rand::seq::SliceRandom;
use tracing::debug;

use crate::error::VectorError;
use crate::metric::{squared_l2, Metric};

/// Structural parameters for an IVF+PQ index.
///
/// All fields are fixed at construction and persisted with the index.
#[derive(Debug, Clone)]
pub struct IvfPqConfig {
    /// Number of inverted lists (coarse partitions)
    pub nlist: usize,
    /// Number of PQ subspaces (m). Dimension must be divisible by this.
    pub sub_vectors: usize,
    /// Bits per PQ code (determines 2^bits centroids per subspace)
    pub bits_per_code: usize,
    /// k-means iterations for both the coarse quantizer and the codebooks
    pub kmeans_iterations: usize,
    /// Lists scanned per query. Defaults to `min(16, max(1, nlist / 4))`;
    /// higher values trade latency for recall.
    pub nprobe: Option<usize>,
}

impl Default for IvfPqConfig {
    fn default() -> Self {
        Self {
            nlist: 100,
            sub_vectors: 16,
            bits_per_code: 8,
            kmeans_iterations: 25,
            nprobe: None,
        }
    }
}

impl IvfPqConfig {
    pub fn new(nlist: usize) -> Self {
        Self {
            nlist,
            ..Default::default()
        }
    }

    pub fn with_sub_vectors(mut self, m: usize) -> Self {
        self.sub_vectors = m;
        self
    }

    pub fn with_bits_per_code(mut self, bits: usize) -> Self {
        self.bits_per_code = bits;
        self
    }

    pub fn with_nprobe(mut self, nprobe: usize) -> Self {
        self.nprobe = Some(nprobe);
        self
    }

    fn default_nprobe(nlist: usize) -> usize {
        (nlist / 4).clamp(1, 16)
    }
}

/// One compressed entry of an inverted list.
#[derive(Debug, Clone, Encode, Decode)]
struct PostingEntry {
    id: usize,
    code: Vec<u8>,
}

/// Approximate nearest-neighbor index: IVF partitioning + PQ codes.
///
/// Append-only; ids are dense insertion positions shared with the
/// collection's metadata store.
#[derive(Debug, Clone, Encode, Decode)]
pub struct IvfPqIndex {
    dimension: usize,
    metric: Metric,
    nlist: usize,
    sub_vectors: usize,
    subspace_dim: usize,
    num_centroids: usize,
    kmeans_iterations: usize,
    nprobe: usize,
    trained: bool,
    /// Coarse quantizer centroids, nlist x dimension
    coarse_centroids: Vec<Vec<f32>>,
    /// PQ codebooks: [subspace][centroid] -> subvector
    codebooks: Vec<Vec<Vec<f32>>>,
    /// Inverted lists, one per coarse centroid
    lists: Vec<Vec<PostingEntry>>,
    count: usize,
}

impl IvfPqIndex {
    pub fn new(dimension: usize, metric: Metric, config: IvfPqConfig) -> Result<Self, VectorError> {
        if config.nlist == 0 {
            return Err(VectorError::Config("nlist must be at least 1".to_string()));
        }
        if config.sub_vectors == 0 || dimension % config.sub_vectors != 0 {
            return Err(VectorError::Config(format!(
                "dimension {} not divisible by {} sub-vectors",
                dimension, config.sub_vectors
            )));
        }
        if config.bits_per_code == 0 || config.bits_per_code > 8 {
            return Err(VectorError::Config(format!(
                "bits_per_code must be in 1..=8, got {}",
                config.bits_per_code
            )));
        }

        let nprobe = config
            .nprobe
            .unwrap_or_else(|| IvfPqConfig::default_nprobe(config.nlist))
            .clamp(1, config.nlist);

        Ok(Self {
            dimension,
            metric,
            nlist: config.nlist,
            sub_vectors: config.sub_vectors,
            subspace_dim: dimension / config.sub_vectors,
            num_centroids: 1 << config.bits_per_code,
            kmeans_iterations: config.kmeans_iterations,
            nprobe,
            trained: false,
            coarse_centroids: Vec::new(),
            codebooks: Vec::new(),
            lists: Vec::new(),
            count: 0,
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_trained(&self) -> bool {
        self.trained
    }

    pub fn nprobe(&self) -> usize {
        self.nprobe
    }

    /// Fit the coarse quantizer and the PQ codebooks on a representative
    /// sample of prepared vectors.
    ///
    /// Training happens exactly once: a second call on an already-trained
    /// index is an idempotent no-op.
    pub(crate) fn train_prepared(&mut self, sample: &[Vec<f32>]) -> Result<(), VectorError> {
        if self.trained {
            debug!("index already trained, ignoring repeat train call");
            return Ok(());
        }
        if sample.is_empty() {
            return Err(VectorError::Config(
                "training sample must not be empty".to_string(),
            ));
        }

        self.coarse_centroids = kmeans(sample, self.nlist, self.kmeans_iterations);

        let mut codebooks = Vec::with_capacity(self.sub_vectors);
        for subspace in 0..self.sub_vectors {
            let start = subspace * self.subspace_dim;
            let end = start + self.subspace_dim;
            let subvectors: Vec<Vec<f32>> =
                sample.iter().map(|v| v[start..end].to_vec()).collect();
            codebooks.push(kmeans(&subvectors, self.num_centroids, self.kmeans_iterations));
        }
        self.codebooks = codebooks;

        self.lists = vec![Vec::new(); self.nlist];
        self.trained = true;

        debug!(
            nlist = self.nlist,
            sub_vectors = self.sub_vectors,
            sample = sample.len(),
            "trained IVF+PQ structures"
        );
        Ok(())
    }

    /// Append a prepared vector, assigning it to its nearest inverted list.
    pub(crate) fn add_prepared(&mut self, values: &[f32]) -> Result<usize, VectorError> {
        if !self.trained {
            return Err(VectorError::NotTrained);
        }

        let list = nearest(&self.coarse_centroids, values);
        let code = self.encode(values);
        let id = self.count;
        self.lists[list].push(PostingEntry { id, code });
        self.count += 1;
        Ok(id)
    }

    /// Probe the `nprobe` nearest lists and return up to `top_k`
    /// (id, distance) pairs, ascending by distance.
    pub(crate) fn search_prepared(&self, query: &[f32], top_k: usize) -> Vec<(usize, f32)> {
        if !self.trained || top_k == 0 || self.count == 0 {
            return Vec::new();
        }

        // Rank coarse centroids by distance to the query.
        let mut order: Vec<(usize, f32)> = self
            .coarse_centroids
            .iter()
            .enumerate()
            .map(|(i, c)| (i, squared_l2(query, c)))
            .collect();
        order.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        let table = self.distance_table(query);

        let mut results: Vec<(usize, f32)> = Vec::new();
        for &(list, _) in order.iter().take(self.nprobe) {
            for entry in &self.lists[list] {
                let squared = self.squared_from_table(&table, &entry.code);
                results.push((entry.id, self.metric.distance_from_squared_l2(squared)));
            }
        }

        results.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        results.truncate(top_k);
        results
    }

    /// Encode a prepared vector as one codebook centroid id per subspace.
    fn encode(&self, values: &[f32]) -> Vec<u8> {
        let mut code = Vec::with_capacity(self.sub_vectors);
        for subspace in 0..self.sub_vectors {
            let start = subspace * self.subspace_dim;
            let end = start + self.subspace_dim;
            code.push(nearest(&self.codebooks[subspace], &values[start..end]) as u8);
        }
        code
    }

    /// Precompute query-to-centroid squared distances per subspace, so
    /// each code's distance is an O(m) table-lookup sum.
    fn distance_table(&self, query: &[f32]) -> Vec<Vec<f32>> {
        let mut table = Vec::with_capacity(self.sub_vectors);
        for subspace in 0..self.sub_vectors {
            let start = subspace * self.subspace_dim;
            let end = start + self.subspace_dim;
            let sub = &query[start..end];
            table.push(
                self.codebooks[subspace]
                    .iter()
                    .map(|centroid| squared_l2(sub, centroid))
                    .collect(),
            );
        }
        table
    }

    fn squared_from_table(&self, table: &[Vec<f32>], code: &[u8]) -> f32 {
        code.iter()
            .enumerate()
            .map(|(subspace, &centroid)| table[subspace][centroid as usize])
            .sum()
    }
}

/// Index of the nearest centroid by squared L2.
fn nearest(centroids: &[Vec<f32>], values: &[f32]) -> usize {
    let mut best = 0;
    let mut best_dist = f32::MAX;
    for (i, centroid) in centroids.iter().enumerate() {
        let dist = squared_l2(values, centroid);
        if dist < best_dist {
            best_dist = dist;
            best = i;
        }
    }
    best
}

/// Plain Lloyd's k-means with random-point initialization.
/// Pads with zero centroids when the sample is smaller than k.
fn kmeans(vectors: &[Vec<f32>], k: usize, iterations: usize) -> Vec<Vec<f32>> {
    if vectors.is_empty() || k == 0 {
        return Vec::new();
    }

    let dim = vectors[0].len();

    let mut rng = rand::rng();
    let mut indices: Vec<usize> = (0..vectors.len()).collect();
    indices.shuffle(&mut rng);

    let mut centroids: Vec<Vec<f32>> = indices
        .into_iter()
        .take(k.min(vectors.len()))
        .map(|i| vectors[i].clone())
        .collect();
    while centroids.len() < k {
        centroids.push(vec![0.0; dim]);
    }

    for _ in 0..iterations {
        let mut assignments: Vec<Vec<usize>> = vec![Vec::new(); k];
        for (vec_idx, vector) in vectors.iter().enumerate() {
            assignments[nearest(&centroids, vector)].push(vec_idx);
        }

        for (centroid_idx, assigned) in assignments.iter().enumerate() {
            if assigned.is_empty() {
                continue;
            }
            let mut updated = vec![0.0f32; dim];
            for &vec_idx in assigned {
                for (d, val) in vectors[vec_idx].iter().enumerate() {
                    updated[d] += val;
                }
            }
            let count = assigned.len() as f32;
            for val in &mut updated {
                *val /= count;
            }
            centroids[centroid_idx] = updated;
        }
    }

    centroids
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_vectors(n: usize, dim: usize) -> Vec<Vec<f32>> {
        (0..n)
            .map(|i| (0..dim).map(|j| ((i * 31 + j * 7) % 97) as f32 / 97.0).collect())
            .collect()
    }

    fn trained_index(dim: usize, nlist: usize, vectors: &[Vec<f32>]) -> IvfPqIndex {
        let config = IvfPqConfig::new(nlist)
            .with_sub_vectors(4)
            .with_nprobe(nlist);
        let mut index = IvfPqIndex::new(dim, Metric::Euclidean, config).unwrap();
        index.train_prepared(vectors).unwrap();
        for v in vectors {
            index.add_prepared(v).unwrap();
        }
        index
    }

    #[test]
    fn test_add_before_train_fails() {
        let config = IvfPqConfig::new(4).with_sub_vectors(4);
        let mut index = IvfPqIndex::new(16, Metric::Euclidean, config).unwrap();
        let v = vec![0.5; 16];
        assert!(matches!(
            index.add_prepared(&v),
            Err(VectorError::NotTrained)
        ));
    }

    #[test]
    fn test_train_is_idempotent() {
        let vectors = test_vectors(32, 16);
        let config = IvfPqConfig::new(4).with_sub_vectors(4);
        let mut index = IvfPqIndex::new(16, Metric::Euclidean, config).unwrap();

        index.train_prepared(&vectors).unwrap();
        let centroids = index.coarse_centroids.clone();

        // second call must not touch fitted structures
        index.train_prepared(&test_vectors(8, 16)).unwrap();
        assert_eq!(index.coarse_centroids, centroids);
        assert!(index.is_trained());
    }

    #[test]
    fn test_ids_are_dense() {
        let vectors = test_vectors(10, 16);
        let config = IvfPqConfig::new(2).with_sub_vectors(4);
        let mut index = IvfPqIndex::new(16, Metric::Euclidean, config).unwrap();
        index.train_prepared(&vectors).unwrap();

        for (i, v) in vectors.iter().enumerate() {
            assert_eq!(index.add_prepared(v).unwrap(), i);
        }
        assert_eq!(index.len(), 10);
    }

    #[test]
    fn test_search_never_returns_out_of_range_ids() {
        let vectors = test_vectors(8, 16);
        let index = trained_index(16, 4, &vectors);

        let results = index.search_prepared(&vectors[3], 20);
        assert!(results.len() <= 8);
        for (id, _) in results {
            assert!(id < index.len());
        }
    }

    #[test]
    fn test_recall_against_exact_search() {
        // 8 vectors, nlist=4, full probe: the recall sanity bound from the
        // build pipeline. Codebooks initialized from the data itself make
        // PQ distances near-exact at this scale.
        use crate::flat::FlatIndex;

        let dim = 16;
        let vectors = test_vectors(8, dim);
        let index = trained_index(dim, 4, &vectors);

        let mut flat = FlatIndex::new(dim, Metric::Euclidean);
        for v in &vectors {
            flat.push_prepared(v);
        }

        let queries = test_vectors(100, dim + 1)
            .into_iter()
            .map(|v| v[..dim].to_vec())
            .collect::<Vec<_>>();

        let mut agree = 0;
        for q in &queries {
            let approx = index.search_prepared(q, 1);
            let exact = flat.search_prepared(q, 1);
            if approx.first().map(|r| r.0) == exact.first().map(|r| r.0) {
                agree += 1;
            }
        }
        assert!(agree >= 90, "top-1 agreement {}/100 below bound", agree);
    }

    #[test]
    fn test_invalid_configs_rejected() {
        assert!(matches!(
            IvfPqIndex::new(16, Metric::Euclidean, IvfPqConfig::new(0)),
            Err(VectorError::Config(_))
        ));
        assert!(matches!(
            IvfPqIndex::new(15, Metric::Euclidean, IvfPqConfig::new(4).with_sub_vectors(4)),
            Err(VectorError::Config(_))
        ));
        assert!(matches!(
            IvfPqIndex::new(
                16,
                Metric::Euclidean,
                IvfPqConfig::new(4).with_bits_per_code(9)
            ),
            Err(VectorError::Config(_))
        ));
    }

    #[test]
    fn test_default_nprobe_bounds() {
        assert_eq!(IvfPqConfig::default_nprobe(4), 1);
        assert_eq!(IvfPqConfig::default_nprobe(100), 16);
        assert_eq!(IvfPqConfig::default_nprobe(40), 10);
    }

    #[test]
    fn test_kmeans_separates_clusters() {
        let vectors = vec![
            vec![0.0, 0.0],
            vec![0.1, 0.1],
            vec![10.0, 10.0],
            vec![10.1, 10.1],
        ];
        let centroids = kmeans(&vectors, 2, 10);
        assert_eq!(centroids.len(), 2);
        let near_zero = |c: &Vec<f32>| c[0] < 5.0;
        assert_ne!(near_zero(&centroids[0]), near_zero(&centroids[1]));
    }
}
