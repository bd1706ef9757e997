use thiserror::Error;

pub type Result<T> = std::result::Result<T, VectorStoreError>;

#[derive(Error, Debug)]
pub enum VectorStoreError {
    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Clustered index is not trained")]
    NotTrained,

    #[error("Invalid index configuration: {0}")]
    Configuration(String),

    #[error("Index is empty")]
    EmptyIndex,

    #[error("Vector store is not initialized, add documents first")]
    NotInitialized,

    #[error("Row {index} out of range (store holds {len} documents)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Persisted store is corrupt: {0}")]
    PersistenceCorrupt(String),

    #[error("Ingest rolled back: {0}")]
    PartialIngest(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Index encoding error: {0}")]
    Encoding(#[from] bincode::Error),
}

impl VectorStoreError {
    /// Stable machine-readable code for the error kind.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::DimensionMismatch { .. } => "dimension_mismatch",
            Self::NotTrained => "not_trained",
            Self::Configuration(_) => "configuration",
            Self::EmptyIndex => "empty_index",
            Self::NotInitialized => "not_initialized",
            Self::IndexOutOfRange { .. } => "index_out_of_range",
            Self::InvalidParameter(_) => "invalid_parameter",
            Self::PersistenceCorrupt(_) => "persistence_corrupt",
            Self::PartialIngest(_) => "partial_ingest",
            Self::Embedding(_) => "embedding",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
            Self::Encoding(_) => "encoding",
        }
    }
}
