use crate::error::{Result, VectorStoreError};
use crate::types::Document;

/// Append-only document rows, positionally aligned with the vector index.
///
/// Alignment is the owner's job: this type trusts its caller.
#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    rows: Vec<Document>,
}

impl DocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_rows(rows: Vec<Document>) -> Self {
        Self { rows }
    }

    pub fn append(&mut self, documents: Vec<Document>) {
        self.rows.extend(documents);
    }

    pub fn get(&self, row: usize) -> Result<&Document> {
        self.rows.get(row).ok_or(VectorStoreError::IndexOutOfRange {
            index: row,
            len: self.rows.len(),
        })
    }

    /// Rows in insertion order; clone the iterator to walk it again.
    pub fn all(&self) -> impl Iterator<Item = &Document> + Clone + '_ {
        self.rows.iter()
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.rows.truncate(len);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Document] {
        &self.rows
    }
}
