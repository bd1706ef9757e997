use crate::error::{Result, VectorStoreError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use unicode_segmentation::UnicodeSegmentation;

pub const DEFAULT_MODEL_ID: &str = "hash-bow-v1";

/// Source of embedding vectors. Implementations must be deterministic for a
/// fixed model and input so retrieval is reproducible.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    async fn embed_batch(&self, texts: Vec<&str>) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    fn dimension(&self) -> usize;

    fn model_id(&self) -> &str;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingMode {
    /// Hashed bag of words: shared words give nearby vectors.
    Hash,
    /// Pseudo-random vector seeded by the whole text.
    Stub,
}

impl EmbeddingMode {
    pub fn from_env() -> Result<Self> {
        env::var("RAG_EMBEDDING_MODE")
            .unwrap_or_else(|_| "hash".to_string())
            .parse()
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hash => "hash",
            Self::Stub => "stub",
        }
    }
}

impl FromStr for EmbeddingMode {
    type Err = VectorStoreError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "hash" => Ok(Self::Hash),
            "stub" => Ok(Self::Stub),
            other => Err(VectorStoreError::Embedding(format!(
                "Unsupported RAG_EMBEDDING_MODE '{other}' (expected 'hash' or 'stub')"
            ))),
        }
    }
}

/// Local, model-free embedder.
#[derive(Clone, Debug)]
pub struct HashEmbedder {
    mode: EmbeddingMode,
    dimension: usize,
    model_id: String,
}

impl HashEmbedder {
    pub fn new(mode: EmbeddingMode, dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(VectorStoreError::Embedding(
                "embedding dimension must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            mode,
            dimension,
            model_id: format!("{DEFAULT_MODEL_ID}-{}", mode.as_str()),
        })
    }

    #[must_use]
    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    #[must_use]
    pub const fn mode(&self) -> EmbeddingMode {
        self.mode
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        match self.mode {
            EmbeddingMode::Hash => hash_embed(text, self.dimension),
            EmbeddingMode::Stub => stub_embed(text, self.dimension),
        }
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    async fn embed_batch(&self, texts: Vec<&str>) -> Result<Vec<Vec<f32>>> {
        Ok(texts.into_iter().map(|text| self.embed_sync(text)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

fn hash_embed(text: &str, dimension: usize) -> Vec<f32> {
    let mut vec = vec![0.0_f32; dimension];
    for word in text.unicode_words() {
        let hash = fnv1a_64(word.to_lowercase().as_bytes());
        #[allow(clippy::cast_possible_truncation)]
        let bucket = (hash % dimension as u64) as usize;
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        vec[bucket] += sign;
    }
    normalize(&mut vec);
    vec
}

fn stub_embed(text: &str, dimension: usize) -> Vec<f32> {
    let mut state =
        fnv1a_64(text.as_bytes()) ^ (dimension as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    let mut vec = Vec::with_capacity(dimension);
    for _ in 0..dimension {
        let bits = splitmix64(&mut state);
        let high = (bits >> 32) as u32;
        let mantissa = high >> 9;
        let unit = f32::from_bits(0x3f80_0000 | mantissa) - 1.0;
        vec.push(unit.mul_add(2.0, -1.0));
    }
    normalize(&mut vec);
    vec
}

fn normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vec.iter_mut() {
            *v /= norm;
        }
    }
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

const fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
