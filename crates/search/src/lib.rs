//! # RAG Search
//!
//! Query-side retrieval over a [`rag_vector_store::SharedVectorStore`].
//!
//! ## Retrieval methods
//!
//! - **Vector**: nearest neighbours, filtered by a score threshold
//! - **Context**: vector results plus same-source neighbouring chunks
//! - **Keyword**: fraction of distinct query words found in each document
//! - **Hybrid**: vector candidates re-ranked by a weighted blend of both
//!
//! Scores coming out of the index are squared L2 distances. The places where
//! they are read as similarities live in [`score`].
//!
//! ## Example
//!
//! ```no_run
//! use rag_search::Retriever;
//! use rag_vector_store::{EmbeddingMode, HashEmbedder, IndexConfig, SharedVectorStore};
//! use std::sync::Arc;
//!
//! # async fn run() -> rag_search::Result<()> {
//! let store = SharedVectorStore::with_config(IndexConfig::flat(384)?);
//! let embedder = Arc::new(HashEmbedder::new(EmbeddingMode::Hash, 384)?);
//! let retriever = Retriever::new(store, embedder);
//!
//! let response = retriever.hybrid_search("error handling", 5, 0.7).await?;
//! for hit in response.results {
//!     println!("{:.3} {}", hit.combined_score, hit.document.text);
//! }
//! # Ok(())
//! # }
//! ```

pub mod context;
mod error;
pub mod hybrid;
pub mod keyword;
mod retriever;
pub mod score;

pub use context::{ContextNeighbor, ContextualResult};
pub use error::{Result, SearchError};
pub use hybrid::HybridHit;
pub use keyword::{KeywordHit, QueryTerms};
pub use retriever::{
    ContextResponse, HybridResponse, KeywordResponse, RetrievalResponse, Retriever,
    RetrieverStats, RETRIEVAL_METHODS,
};
