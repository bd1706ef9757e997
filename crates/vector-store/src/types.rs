use crate::error::{Result, VectorStoreError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_SOURCE: &str = "unknown";

/// Free-form metadata attached to a stored document.
///
/// Context expansion reads `source` and `page` (falling back to `chunk_id`);
/// every other key is carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(Map<String, Value>);

impl Metadata {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn source(&self) -> Option<&str> {
        self.0.get("source").and_then(Value::as_str)
    }

    #[must_use]
    pub fn page(&self) -> Option<i64> {
        self.0.get("page").and_then(Value::as_i64)
    }

    #[must_use]
    pub fn chunk_id(&self) -> Option<i64> {
        self.0.get("chunk_id").and_then(Value::as_i64)
    }

    /// Position used for neighbour lookups: `page`, else `chunk_id`, else 0.
    #[must_use]
    pub fn position(&self) -> i64 {
        self.page().or_else(|| self.chunk_id()).unwrap_or(0)
    }

    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Metadata synthesised for a row ingested without explicit metadata.
    #[must_use]
    pub fn default_for_row(row: usize, document: &Document) -> Self {
        let source = document
            .metadata
            .source()
            .unwrap_or(DEFAULT_SOURCE)
            .to_string();
        let page = document.metadata.page().unwrap_or(0);
        Self::new()
            .with("chunk_id", row)
            .with("source", source)
            .with("page", page)
    }
}

impl From<Map<String, Value>> for Metadata {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Immutable text content plus metadata, one per index row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    #[must_use]
    pub fn new(text: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            text: text.into(),
            metadata,
        }
    }

    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(text, Metadata::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    /// Exact brute-force search.
    Flat,
    /// Inverted-file index over k-means clusters.
    Ivf,
}

impl IndexKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::Ivf => "ivf",
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndexKind {
    type Err = VectorStoreError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "flat" => Ok(Self::Flat),
            "ivf" | "clustered" => Ok(Self::Ivf),
            other => Err(VectorStoreError::Configuration(format!(
                "unsupported index kind '{other}' (expected 'flat' or 'ivf')"
            ))),
        }
    }
}

pub const DEFAULT_NPROBE: usize = 1;

/// Fixed at construction; changing it means rebuilding the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    dimension: usize,
    kind: IndexKind,
    nprobe: usize,
}

impl IndexConfig {
    pub fn new(dimension: usize, kind: IndexKind) -> Result<Self> {
        if dimension == 0 {
            return Err(VectorStoreError::Configuration(
                "dimension must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            dimension,
            kind,
            nprobe: DEFAULT_NPROBE,
        })
    }

    pub fn flat(dimension: usize) -> Result<Self> {
        Self::new(dimension, IndexKind::Flat)
    }

    pub fn ivf(dimension: usize) -> Result<Self> {
        Self::new(dimension, IndexKind::Ivf)
    }

    /// Number of clusters probed per clustered query.
    pub fn with_nprobe(mut self, nprobe: usize) -> Result<Self> {
        if nprobe == 0 {
            return Err(VectorStoreError::Configuration(
                "nprobe must be greater than zero".to_string(),
            ));
        }
        self.nprobe = nprobe;
        Ok(self)
    }

    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    #[must_use]
    pub const fn kind(&self) -> IndexKind {
        self.kind
    }

    #[must_use]
    pub const fn nprobe(&self) -> usize {
        self.nprobe
    }
}

/// One row returned by a vector query.
///
/// `score` is the raw squared L2 distance: lower means more similar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalResult {
    pub row: usize,
    pub document: Document,
    pub score: f64,
}

impl RetrievalResult {
    #[must_use]
    pub const fn metadata(&self) -> &Metadata {
        &self.document.metadata
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_documents: usize,
    pub index_kind: IndexKind,
    pub dimension: usize,
    pub is_trained: bool,
    pub index_size: usize,
}
