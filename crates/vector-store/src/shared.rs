use crate::codec;
use crate::error::Result;
use crate::store::VectorStore;
use crate::types::{Document, IndexConfig, Metadata, RetrievalResult, StoreStats};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard};

/// Cloneable handle to one store, shared between request handlers.
///
/// Mutation and persistence take the write lock; queries share the read lock,
/// so no reader ever observes a half-applied ingest.
#[derive(Clone, Debug)]
pub struct SharedVectorStore {
    inner: Arc<RwLock<VectorStore>>,
}

impl SharedVectorStore {
    #[must_use]
    pub fn new(store: VectorStore) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    #[must_use]
    pub fn with_config(config: IndexConfig) -> Self {
        Self::new(VectorStore::new(config))
    }

    pub async fn add_documents(
        &self,
        documents: Vec<Document>,
        embeddings: Vec<Vec<f32>>,
        metadata: Option<Vec<Metadata>>,
    ) -> Result<usize> {
        self.inner
            .write()
            .await
            .add_documents(documents, embeddings, metadata)
    }

    pub async fn search(&self, query: &[f32], k: usize) -> Result<Vec<RetrievalResult>> {
        self.inner.read().await.search(query, k)
    }

    pub async fn stats(&self) -> StoreStats {
        self.inner.read().await.stats()
    }

    pub async fn clear(&self) {
        self.inner.write().await.clear();
    }

    pub async fn save(&self, dir: impl AsRef<Path>) -> Result<()> {
        let guard = self.inner.write().await;
        codec::save(&guard, dir).await
    }

    /// Replace the current contents with the store saved in `dir`.
    ///
    /// On failure the current contents are kept.
    pub async fn load(&self, dir: impl AsRef<Path>) -> Result<()> {
        let mut guard = self.inner.write().await;
        let loaded = codec::load(dir).await?;
        *guard = loaded;
        Ok(())
    }

    /// Read guard for multi-step queries that need one consistent snapshot.
    pub async fn read(&self) -> RwLockReadGuard<'_, VectorStore> {
        self.inner.read().await
    }
}
