//! Nearest-neighbour indexes over fixed-dimension `f32` vectors.
//!
//! Rows are addressed by insertion order; row `i` of an index is row `i` of
//! the owning [`crate::VectorStore`]'s document store.

mod distance;
mod flat;
mod ivf;
mod kmeans;

pub use distance::squared_l2;
pub use flat::FlatIndex;
pub use ivf::{cluster_count, IvfIndex, MIN_TRAINING_VECTORS};

use crate::error::{Result, VectorStoreError};
use crate::types::{IndexConfig, IndexKind};

/// A row hit: position in the index plus its squared L2 distance to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub row: usize,
    pub distance: f32,
}

/// Capability shared by every index backend.
pub trait VectorIndex {
    /// Append vectors after the current last row.
    fn add(&mut self, vectors: &[Vec<f32>]) -> Result<()>;

    /// Up to `k` nearest rows, ascending by distance, ties in row order.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>>;

    /// Drop every row at position `len` or later.
    fn truncate(&mut self, len: usize);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_trained(&self) -> bool;

    fn dimension(&self) -> usize;

    fn kind(&self) -> IndexKind;
}

/// Closed set of backends, selected by [`IndexConfig::kind`].
#[derive(Debug, Clone)]
pub enum IndexBackend {
    Flat(FlatIndex),
    Ivf(IvfIndex),
}

impl IndexBackend {
    /// Construct, train when required, and load the initial vectors.
    pub fn build(config: &IndexConfig, initial: &[Vec<f32>]) -> Result<Self> {
        validate_vectors(config.dimension(), initial)?;
        match config.kind() {
            IndexKind::Flat => {
                let mut index = FlatIndex::new(config.dimension());
                index.add(initial)?;
                Ok(Self::Flat(index))
            }
            IndexKind::Ivf => {
                let mut index = IvfIndex::new(config.dimension(), config.nprobe());
                index.train(initial)?;
                index.add(initial)?;
                Ok(Self::Ivf(index))
            }
        }
    }

    fn inner(&self) -> &dyn VectorIndex {
        match self {
            Self::Flat(index) => index,
            Self::Ivf(index) => index,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn VectorIndex {
        match self {
            Self::Flat(index) => index,
            Self::Ivf(index) => index,
        }
    }
}

impl VectorIndex for IndexBackend {
    fn add(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
        self.inner_mut().add(vectors)
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        self.inner().search(query, k)
    }

    fn truncate(&mut self, len: usize) {
        self.inner_mut().truncate(len);
    }

    fn len(&self) -> usize {
        self.inner().len()
    }

    fn is_trained(&self) -> bool {
        self.inner().is_trained()
    }

    fn dimension(&self) -> usize {
        self.inner().dimension()
    }

    fn kind(&self) -> IndexKind {
        self.inner().kind()
    }
}

/// Every vector must have `expected` components, all of them finite.
pub(crate) fn validate_vectors(expected: usize, vectors: &[Vec<f32>]) -> Result<()> {
    if let Some(bad) = vectors.iter().find(|v| v.len() != expected) {
        return Err(VectorStoreError::DimensionMismatch {
            expected,
            actual: bad.len(),
        });
    }
    match vectors.iter().position(|v| !all_finite(v)) {
        Some(row) => Err(VectorStoreError::InvalidParameter(format!(
            "embedding {row} has a non-finite component"
        ))),
        None => Ok(()),
    }
}

pub(crate) fn validate_query(expected: usize, query: &[f32]) -> Result<()> {
    if query.len() != expected {
        return Err(VectorStoreError::DimensionMismatch {
            expected,
            actual: query.len(),
        });
    }
    if !all_finite(query) {
        return Err(VectorStoreError::InvalidParameter(
            "query embedding has a non-finite component".to_string(),
        ));
    }
    Ok(())
}

fn all_finite(vector: &[f32]) -> bool {
    vector.iter().all(|value| value.is_finite())
}

/// Orders by distance, then by row so equal distances keep insertion order.
pub(crate) fn rank_neighbors(neighbors: &mut Vec<Neighbor>, k: usize) {
    neighbors.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.row.cmp(&b.row)));
    neighbors.truncate(k);
}
