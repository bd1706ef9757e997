use super::distance::squared_l2;
use super::{rank_neighbors, validate_query, validate_vectors, Neighbor, VectorIndex};
use crate::error::{Result, VectorStoreError};
use crate::types::IndexKind;
use ndarray::{s, Array2, Axis};

/// Exact brute-force index: every query is compared against every row.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimension: usize,
    vectors: Array2<f32>,
}

impl FlatIndex {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Array2::zeros((0, dimension)),
        }
    }

    pub(crate) fn from_vectors(vectors: Array2<f32>) -> Self {
        Self {
            dimension: vectors.ncols(),
            vectors,
        }
    }

    #[must_use]
    pub const fn vectors(&self) -> &Array2<f32> {
        &self.vectors
    }
}

/// Packs row vectors into one matrix so they can be appended in a single step.
pub(crate) fn to_matrix(dimension: usize, vectors: &[Vec<f32>]) -> Result<Array2<f32>> {
    validate_vectors(dimension, vectors)?;
    let flat: Vec<f32> = vectors.iter().flatten().copied().collect();
    Array2::from_shape_vec((vectors.len(), dimension), flat)
        .map_err(|err| VectorStoreError::Configuration(format!("pack vectors: {err}")))
}

pub(crate) fn append_rows(target: &mut Array2<f32>, batch: &Array2<f32>) -> Result<()> {
    target
        .append(Axis(0), batch.view())
        .map_err(|err| VectorStoreError::Configuration(format!("append vectors: {err}")))
}

pub(crate) fn truncate_rows(target: &mut Array2<f32>, len: usize) {
    if len < target.nrows() {
        *target = target.slice(s![..len, ..]).to_owned();
    }
}

impl VectorIndex for FlatIndex {
    fn add(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
        if vectors.is_empty() {
            return Ok(());
        }
        let batch = to_matrix(self.dimension, vectors)?;
        append_rows(&mut self.vectors, &batch)
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        validate_query(self.dimension, query)?;
        if self.vectors.nrows() == 0 {
            return Err(VectorStoreError::EmptyIndex);
        }

        let mut hits: Vec<Neighbor> = self
            .vectors
            .outer_iter()
            .enumerate()
            .map(|(row, vector)| Neighbor {
                row,
                distance: squared_l2(vector, query),
            })
            .collect();
        rank_neighbors(&mut hits, k);
        Ok(hits)
    }

    fn truncate(&mut self, len: usize) {
        truncate_rows(&mut self.vectors, len);
    }

    fn len(&self) -> usize {
        self.vectors.nrows()
    }

    /// Nothing to train; matches how stats and the sidecar report flat stores.
    fn is_trained(&self) -> bool {
        false
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn kind(&self) -> IndexKind {
        IndexKind::Flat
    }
}
