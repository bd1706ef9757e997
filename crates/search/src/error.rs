use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Vector store error: {0}")]
    VectorStoreError(#[from] rag_vector_store::VectorStoreError),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl SearchError {
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::VectorStoreError(err) => err.code(),
            Self::InvalidParameter(_) => "invalid_parameter",
        }
    }
}
