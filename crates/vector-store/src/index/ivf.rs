use super::distance::squared_l2;
use super::flat::{append_rows, to_matrix, truncate_rows};
use super::kmeans;
use super::{rank_neighbors, validate_query, Neighbor, VectorIndex};
use crate::error::{Result, VectorStoreError};
use crate::types::IndexKind;
use ndarray::Array2;

pub const MAX_CLUSTERS: usize = 100;
pub const MIN_TRAINING_VECTORS: usize = 10;

/// `min(100, n / 10)`; zero for fewer than ten training vectors.
#[must_use]
pub const fn cluster_count(training_vectors: usize) -> usize {
    let nlist = training_vectors / 10;
    if nlist < MAX_CLUSTERS {
        nlist
    } else {
        MAX_CLUSTERS
    }
}

/// Inverted-file index: rows are bucketed under their nearest k-means
/// centroid and a query scans only the closest buckets.
#[derive(Debug, Clone)]
pub struct IvfIndex {
    dimension: usize,
    nprobe: usize,
    centroids: Option<Array2<f32>>,
    lists: Vec<Vec<usize>>,
    vectors: Array2<f32>,
}

impl IvfIndex {
    #[must_use]
    pub fn new(dimension: usize, nprobe: usize) -> Self {
        Self {
            dimension,
            nprobe: nprobe.max(1),
            centroids: None,
            lists: Vec::new(),
            vectors: Array2::zeros((0, dimension)),
        }
    }

    pub(crate) fn from_parts(
        nprobe: usize,
        centroids: Option<Array2<f32>>,
        lists: Vec<Vec<usize>>,
        vectors: Array2<f32>,
    ) -> Self {
        Self {
            dimension: vectors.ncols(),
            nprobe: nprobe.max(1),
            centroids,
            lists,
            vectors,
        }
    }

    /// Learn the cluster centroids. Blocks until training completes.
    pub fn train(&mut self, training: &[Vec<f32>]) -> Result<()> {
        let nlist = cluster_count(training.len());
        if nlist == 0 {
            return Err(VectorStoreError::Configuration(format!(
                "clustered index needs at least {MIN_TRAINING_VECTORS} training vectors, got {}",
                training.len()
            )));
        }
        let data = to_matrix(self.dimension, training)?;
        log::info!(
            "Training clustered index: {} vectors, {nlist} clusters",
            training.len()
        );
        let centroids = kmeans::train(&data, nlist);
        self.lists = vec![Vec::new(); nlist];
        self.centroids = Some(centroids);
        Ok(())
    }

    #[must_use]
    pub const fn nprobe(&self) -> usize {
        self.nprobe
    }

    #[must_use]
    pub fn nlist(&self) -> usize {
        self.lists.len()
    }

    #[must_use]
    pub const fn centroids(&self) -> Option<&Array2<f32>> {
        self.centroids.as_ref()
    }

    #[must_use]
    pub fn lists(&self) -> &[Vec<usize>] {
        &self.lists
    }

    #[must_use]
    pub const fn vectors(&self) -> &Array2<f32> {
        &self.vectors
    }

    /// Cluster ids ordered by centroid distance to the query.
    fn probe_order(centroids: &Array2<f32>, query: &[f32]) -> Vec<usize> {
        let mut order: Vec<(usize, f32)> = centroids
            .outer_iter()
            .enumerate()
            .map(|(cluster, centroid)| (cluster, squared_l2(centroid, query)))
            .collect();
        order.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        order.into_iter().map(|(cluster, _)| cluster).collect()
    }
}

impl VectorIndex for IvfIndex {
    fn add(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
        let Some(centroids) = self.centroids.as_ref() else {
            return Err(VectorStoreError::NotTrained);
        };
        if vectors.is_empty() {
            return Ok(());
        }
        let batch = to_matrix(self.dimension, vectors)?;
        let assignments: Vec<usize> = batch
            .outer_iter()
            .map(|vector| kmeans::nearest_centroid(centroids, vector))
            .collect();

        let first_row = self.vectors.nrows();
        append_rows(&mut self.vectors, &batch)?;
        for (offset, cluster) in assignments.into_iter().enumerate() {
            self.lists[cluster].push(first_row + offset);
        }
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        validate_query(self.dimension, query)?;
        let Some(centroids) = self.centroids.as_ref() else {
            return Err(VectorStoreError::NotTrained);
        };
        if self.vectors.nrows() == 0 {
            return Err(VectorStoreError::EmptyIndex);
        }

        // Probe `nprobe` lists, then keep widening until k candidates exist.
        let mut candidates: Vec<usize> = Vec::new();
        for (probed, cluster) in Self::probe_order(centroids, query).into_iter().enumerate() {
            if probed >= self.nprobe && candidates.len() >= k {
                break;
            }
            candidates.extend_from_slice(&self.lists[cluster]);
        }

        let mut hits: Vec<Neighbor> = candidates
            .into_iter()
            .map(|row| Neighbor {
                row,
                distance: squared_l2(self.vectors.row(row), query),
            })
            .collect();
        rank_neighbors(&mut hits, k);
        Ok(hits)
    }

    fn truncate(&mut self, len: usize) {
        truncate_rows(&mut self.vectors, len);
        for list in &mut self.lists {
            list.retain(|&row| row < len);
        }
    }

    fn len(&self) -> usize {
        self.vectors.nrows()
    }

    fn is_trained(&self) -> bool {
        self.centroids.is_some()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn kind(&self) -> IndexKind {
        IndexKind::Ivf
    }
}
