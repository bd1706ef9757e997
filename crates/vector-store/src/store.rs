use crate::documents::DocumentStore;
use crate::error::{Result, VectorStoreError};
use crate::index::{validate_vectors, IndexBackend, VectorIndex};
use crate::types::{Document, IndexConfig, Metadata, RetrievalResult, StoreStats};

/// Vector index plus document rows, kept in lockstep.
///
/// Every successful mutation leaves `index.len() == documents.len()`; a
/// failed `add_documents` leaves both exactly as they were.
#[derive(Debug, Clone)]
pub struct VectorStore {
    config: IndexConfig,
    index: Option<IndexBackend>,
    documents: DocumentStore,
}

impl VectorStore {
    #[must_use]
    pub fn new(config: IndexConfig) -> Self {
        Self {
            config,
            index: None,
            documents: DocumentStore::new(),
        }
    }

    pub(crate) fn from_parts(
        config: IndexConfig,
        index: IndexBackend,
        documents: DocumentStore,
    ) -> Self {
        Self {
            config,
            index: Some(index),
            documents,
        }
    }

    /// Ingest a batch. The first batch builds (and for clustered indexes
    /// trains) the index; later batches are appended to it.
    ///
    /// Without `metadata`, each row gets `{chunk_id, source, page}` derived
    /// from the document. Returns the number of rows added.
    pub fn add_documents(
        &mut self,
        documents: Vec<Document>,
        embeddings: Vec<Vec<f32>>,
        metadata: Option<Vec<Metadata>>,
    ) -> Result<usize> {
        if documents.len() != embeddings.len() {
            return Err(VectorStoreError::InvalidParameter(format!(
                "{} documents but {} embeddings",
                documents.len(),
                embeddings.len()
            )));
        }
        if let Some(metadata) = &metadata {
            if metadata.len() != documents.len() {
                return Err(VectorStoreError::InvalidParameter(format!(
                    "{} documents but {} metadata entries",
                    documents.len(),
                    metadata.len()
                )));
            }
        }
        if documents.is_empty() {
            return Ok(0);
        }
        validate_vectors(self.config.dimension(), &embeddings)?;

        let before = self.documents.len();
        let rows = attach_metadata(before, documents, metadata);
        let added = rows.len();

        log::info!("Adding {added} documents to store");
        match self.index.as_mut() {
            None => {
                let index = IndexBackend::build(&self.config, &embeddings)?;
                self.index = Some(index);
            }
            Some(index) => {
                if let Err(err) = index.add(&embeddings) {
                    index.truncate(before);
                    log::warn!("Ingest of {added} documents rolled back: {err}");
                    return Err(err);
                }
            }
        }
        self.documents.append(rows);

        let indexed = self.index.as_ref().map_or(0, VectorIndex::len);
        if indexed != self.documents.len() {
            self.rollback(before);
            log::warn!("Ingest of {added} documents rolled back: index/document drift");
            return Err(VectorStoreError::PartialIngest(format!(
                "index holds {indexed} rows but {} documents were stored",
                before + added
            )));
        }

        log::info!("Successfully added documents. Total: {}", self.documents.len());
        Ok(added)
    }

    fn rollback(&mut self, len: usize) {
        if len == 0 {
            self.index = None;
        } else if let Some(index) = self.index.as_mut() {
            index.truncate(len);
        }
        self.documents.truncate(len);
    }

    /// Up to `k` nearest documents, ascending by squared L2 distance.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<RetrievalResult>> {
        if k == 0 {
            return Err(VectorStoreError::InvalidParameter(
                "k must be greater than zero".to_string(),
            ));
        }
        let index = self.index.as_ref().ok_or(VectorStoreError::NotInitialized)?;
        log::debug!("Searching {} rows (k: {k})", index.len());

        index
            .search(query, k)?
            .into_iter()
            .map(|hit| {
                let document = self.documents.get(hit.row)?.clone();
                Ok(RetrievalResult {
                    row: hit.row,
                    document,
                    score: f64::from(hit.distance),
                })
            })
            .collect()
    }

    #[must_use]
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            total_documents: self.documents.len(),
            index_kind: self.config.kind(),
            dimension: self.config.dimension(),
            is_trained: self.index.as_ref().is_some_and(VectorIndex::is_trained),
            index_size: self.index.as_ref().map_or(0, VectorIndex::len),
        }
    }

    /// Drop the index and every document.
    pub fn clear(&mut self) {
        log::info!("Clearing vector store ({} documents)", self.documents.len());
        self.index = None;
        self.documents.clear();
    }

    pub fn get(&self, row: usize) -> Result<&Document> {
        self.documents.get(row)
    }

    pub fn documents(&self) -> impl Iterator<Item = &Document> + Clone + '_ {
        self.documents.all()
    }

    #[must_use]
    pub const fn document_store(&self) -> &DocumentStore {
        &self.documents
    }

    #[must_use]
    pub const fn index(&self) -> Option<&IndexBackend> {
        self.index.as_ref()
    }

    #[must_use]
    pub const fn config(&self) -> &IndexConfig {
        &self.config
    }

    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.index.is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

fn attach_metadata(
    first_row: usize,
    documents: Vec<Document>,
    metadata: Option<Vec<Metadata>>,
) -> Vec<Document> {
    match metadata {
        Some(metadata) => documents
            .into_iter()
            .zip(metadata)
            .map(|(document, metadata)| Document {
                text: document.text,
                metadata,
            })
            .collect(),
        None => documents
            .into_iter()
            .enumerate()
            .map(|(offset, document)| {
                let metadata = Metadata::default_for_row(first_row + offset, &document);
                Document {
                    text: document.text,
                    metadata,
                }
            })
            .collect(),
    }
}
