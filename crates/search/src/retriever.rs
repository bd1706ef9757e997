use crate::context::{self, ContextualResult};
use crate::error::{Result, SearchError};
use crate::hybrid::{self, HybridHit, CANDIDATE_MULTIPLIER};
use crate::keyword::{self, KeywordHit};
use crate::score;
use rag_vector_store::{Embedder, RetrievalResult, SharedVectorStore, StoreStats, VectorStore};
use serde::Serialize;
use std::sync::Arc;

pub const RETRIEVAL_METHODS: [&str; 3] = ["vector", "keyword", "hybrid"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalResponse {
    pub query: String,
    pub results: Vec<RetrievalResult>,
    pub total_found: usize,
    pub query_embedding: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextResponse {
    pub query: String,
    pub results: Vec<ContextualResult>,
    pub total_found: usize,
    pub context_window: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HybridResponse {
    pub query: String,
    pub results: Vec<HybridHit>,
    pub total_found: usize,
    pub alpha: f64,
    pub search_type: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeywordResponse {
    pub query: String,
    pub results: Vec<KeywordHit>,
    pub total_found: usize,
    pub search_type: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrieverStats {
    pub vector_store: StoreStats,
    pub embedding_model: String,
    pub retrieval_methods: Vec<&'static str>,
}

/// Query front end over a shared store.
///
/// Holds no state of its own. Each call embeds the query before taking the
/// store's read lock, then runs search, join and expansion under a single
/// guard.
#[derive(Clone)]
pub struct Retriever {
    store: SharedVectorStore,
    embedder: Arc<dyn Embedder>,
}

impl Retriever {
    pub fn new(store: SharedVectorStore, embedder: Arc<dyn Embedder>) -> Self {
        Self { store, embedder }
    }

    pub const fn store(&self) -> &SharedVectorStore {
        &self.store
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    /// Vector search keeping results whose score passes the threshold.
    ///
    /// See [`score::meets_score_threshold`] for what the threshold compares.
    pub async fn retrieve(
        &self,
        query: &str,
        k: usize,
        score_threshold: f64,
    ) -> Result<RetrievalResponse> {
        log::info!("Retrieving documents for query: {query}");
        let query_embedding = self.embedder.embed(query).await?;

        let store = self.store.read().await;
        let results = search_filtered(&store, &query_embedding, k, score_threshold)?;
        drop(store);

        log::info!("Retrieved {} documents", results.len());
        Ok(RetrievalResponse {
            query: query.to_string(),
            total_found: results.len(),
            results,
            query_embedding,
        })
    }

    /// Vector search plus same-source neighbours within `context_window`.
    pub async fn retrieve_with_context(
        &self,
        query: &str,
        k: usize,
        context_window: usize,
    ) -> Result<ContextResponse> {
        let query_embedding = self.embedder.embed(query).await?;

        let store = self.store.read().await;
        let results = search_filtered(&store, &query_embedding, k, 0.0)?;
        let results = context::expand(results, store.documents(), context_window);
        drop(store);

        log::info!(
            "Retrieved {} documents with context window {context_window}",
            results.len()
        );
        Ok(ContextResponse {
            query: query.to_string(),
            total_found: results.len(),
            results,
            context_window,
        })
    }

    /// Re-rank `2k` vector candidates by blending distance and keyword overlap.
    pub async fn hybrid_search(
        &self,
        query: &str,
        k: usize,
        alpha: f64,
    ) -> Result<HybridResponse> {
        hybrid::validate_alpha(alpha)?;
        let pool = k.saturating_mul(CANDIDATE_MULTIPLIER);
        let query_embedding = self.embedder.embed(query).await?;

        let store = self.store.read().await;
        let candidates = search_filtered(&store, &query_embedding, pool, 0.0)?;
        drop(store);

        let results = hybrid::rerank(query, candidates, alpha, k)?;
        log::info!("Hybrid search returned {} documents", results.len());
        Ok(HybridResponse {
            query: query.to_string(),
            total_found: results.len(),
            results,
            alpha,
            search_type: "hybrid",
        })
    }

    /// Lexical-only ranking over every stored document.
    pub async fn keyword_search(&self, query: &str, k: usize) -> Result<KeywordResponse> {
        if k == 0 {
            return Err(SearchError::InvalidParameter(
                "k must be greater than zero".to_string(),
            ));
        }
        let store = self.store.read().await;
        let results = keyword::keyword_search(query, store.documents(), k);
        drop(store);

        log::debug!("Keyword search returned {} documents", results.len());
        Ok(KeywordResponse {
            query: query.to_string(),
            total_found: results.len(),
            results,
            search_type: "keyword",
        })
    }

    pub async fn stats(&self) -> RetrieverStats {
        RetrieverStats {
            vector_store: self.store.stats().await,
            embedding_model: self.embedder.model_id().to_string(),
            retrieval_methods: RETRIEVAL_METHODS.to_vec(),
        }
    }
}

fn search_filtered(
    store: &VectorStore,
    query_embedding: &[f32],
    k: usize,
    score_threshold: f64,
) -> Result<Vec<RetrievalResult>> {
    let mut results = store.search(query_embedding, k)?;
    results.retain(|result| score::meets_score_threshold(result.score, score_threshold));
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rag_vector_store::{
        Document, EmbeddingMode, HashEmbedder, IndexConfig, Metadata, VectorStoreError,
    };

    async fn retriever() -> Retriever {
        let embedder = HashEmbedder::new(EmbeddingMode::Hash, 64).unwrap();
        let store = SharedVectorStore::with_config(IndexConfig::flat(64).unwrap());
        let texts = ["red apple pie", "green apple tart", "blue whale song"];
        let mut embeddings = Vec::new();
        for text in texts {
            embeddings.push(embedder.embed(text).await.unwrap());
        }
        let documents = texts
            .iter()
            .enumerate()
            .map(|(i, text)| {
                Document::new(*text, Metadata::new().with("source", "fruit").with("page", i))
            })
            .collect();
        store.add_documents(documents, embeddings, None).await.unwrap();
        Retriever::new(store, Arc::new(embedder))
    }

    #[tokio::test]
    async fn exact_text_comes_first() {
        let retriever = retriever().await;
        let response = retriever.retrieve("blue whale song", 2, 0.0).await.unwrap();
        assert_eq!(response.total_found, 2);
        assert_eq!(response.results[0].document.text, "blue whale song");
        assert!(response.results[0].score.abs() < 1e-6);
        assert_eq!(response.query_embedding.len(), 64);
    }

    #[tokio::test]
    async fn threshold_filters_on_raw_distance() {
        let retriever = retriever().await;
        let response = retriever.retrieve("blue whale song", 3, 0.01).await.unwrap();
        assert!(response
            .results
            .iter()
            .all(|result| result.document.text != "blue whale song"));
    }

    #[tokio::test]
    async fn empty_store_is_not_initialized() {
        let embedder = HashEmbedder::new(EmbeddingMode::Stub, 4).unwrap();
        let store = SharedVectorStore::with_config(IndexConfig::flat(4).unwrap());
        let retriever = Retriever::new(store, Arc::new(embedder));
        let err = retriever.retrieve("anything", 1, 0.0).await.unwrap_err();
        assert!(matches!(
            err,
            SearchError::VectorStoreError(VectorStoreError::NotInitialized)
        ));
        assert_eq!(err.code(), "not_initialized");
    }

    #[tokio::test]
    async fn hybrid_rejects_alpha_before_embedding() {
        let retriever = retriever().await;
        let err = retriever.hybrid_search("apple", 2, 2.0).await.unwrap_err();
        assert_eq!(err.code(), "invalid_parameter");
    }

    #[tokio::test]
    async fn keyword_rejects_zero_k() {
        let retriever = retriever().await;
        assert!(retriever.keyword_search("apple", 0).await.is_err());
    }

    #[tokio::test]
    async fn stats_report_model_and_methods() {
        let retriever = retriever().await;
        let stats = retriever.stats().await;
        assert_eq!(stats.vector_store.total_documents, 3);
        assert_eq!(stats.embedding_model, "hash-bow-v1-hash");
        assert_eq!(stats.retrieval_methods, vec!["vector", "keyword", "hybrid"]);
    }
}
