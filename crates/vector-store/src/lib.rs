//! # RAG Vector Store
//!
//! Storage and nearest-neighbour retrieval for text chunks with embeddings.
//!
//! ## Features
//!
//! - **Exact search** with a flat (brute-force) index
//! - **Approximate search** with a k-means inverted-file index
//! - **Aligned document rows**: index row `i` is always document `i`
//! - **Atomic ingestion**: a failed batch leaves the store untouched
//! - **Persistence** as an index blob plus a JSON sidecar
//!
//! ## Architecture
//!
//! ```text
//! (Document, Embedding)[]
//!     │
//!     ├──> IndexBackend (Flat | Ivf)
//!     │      └─> search -> (row, squared L2)
//!     │
//!     ├──> DocumentStore
//!     │      └─> row -> Document
//!     │
//!     └──> codec
//!            └─> index.bin + index.json
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use rag_vector_store::{Document, IndexConfig, VectorStore};
//!
//! fn main() -> rag_vector_store::Result<()> {
//!     let mut store = VectorStore::new(IndexConfig::flat(2)?);
//!     store.add_documents(
//!         vec![Document::text("cat on mat"), Document::text("dog in fog")],
//!         vec![vec![1.0, 0.0], vec![0.0, 1.0]],
//!         None,
//!     )?;
//!
//!     for result in store.search(&[1.0, 0.0], 1)? {
//!         println!("{}: {:.3}", result.document.text, result.score);
//!     }
//!     Ok(())
//! }
//! ```

pub mod codec;
mod documents;
mod embeddings;
mod error;
pub mod index;
mod paths;
mod shared;
mod store;
mod types;

pub use documents::DocumentStore;
pub use embeddings::{Embedder, EmbeddingMode, HashEmbedder, DEFAULT_MODEL_ID};
pub use error::{Result, VectorStoreError};
pub use index::{IndexBackend, Neighbor, VectorIndex};
pub use paths::{config_path, index_blob_path, sidecar_path, store_exists};
pub use shared::SharedVectorStore;
pub use store::VectorStore;
pub use types::{
    Document, IndexConfig, IndexKind, Metadata, RetrievalResult, StoreStats, DEFAULT_NPROBE,
    DEFAULT_SOURCE,
};
