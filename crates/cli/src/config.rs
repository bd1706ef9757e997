use anyhow::{Context as AnyhowContext, Result};
use rag_vector_store::{
    config_path, EmbeddingMode, HashEmbedder, IndexConfig, IndexKind, DEFAULT_NPROBE,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use tokio::fs;

pub const ENV_STORE_DIR: &str = "RAG_STORE_DIR";
pub const ENV_EMBEDDING_MODE: &str = "RAG_EMBEDDING_MODE";
pub const ENV_EMBEDDING_MODEL: &str = "RAG_EMBEDDING_MODEL";

pub const DEFAULT_STORE_DIR: &str = ".rag";
pub const DEFAULT_DIMENSION: usize = 384;

/// Fully resolved settings for one CLI invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub store_dir: PathBuf,
    pub dimension: usize,
    pub index_kind: IndexKind,
    pub nprobe: usize,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalDefaults,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub mode: EmbeddingMode,
    pub model_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalDefaults {
    pub k: usize,
    pub score_threshold: f64,
    pub context_window: usize,
    pub alpha: f64,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from(DEFAULT_STORE_DIR),
            dimension: DEFAULT_DIMENSION,
            index_kind: IndexKind::Flat,
            nprobe: DEFAULT_NPROBE,
            embedding: EmbeddingConfig::default(),
            retrieval: RetrievalDefaults::default(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            mode: EmbeddingMode::Hash,
            model_id: None,
        }
    }
}

impl Default for RetrievalDefaults {
    fn default() -> Self {
        Self {
            k: 5,
            score_threshold: 0.0,
            context_window: 2,
            alpha: 0.7,
        }
    }
}

/// Values given on the command line; `None` leaves the lower layers alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub store_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub dimension: Option<usize>,
    pub index_kind: Option<IndexKind>,
    pub nprobe: Option<usize>,
    pub embed_mode: Option<EmbeddingMode>,
    pub embed_model: Option<String>,
}

impl RagConfig {
    /// Defaults, then the config file, then environment, then flags.
    pub async fn resolve(overrides: &Overrides) -> Result<Self> {
        Self::resolve_with(overrides, |key| env::var(key).ok()).await
    }

    pub async fn resolve_with(
        overrides: &Overrides,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let explicit = match &overrides.config {
            Some(path) => Some(Self::load_file(path).await?),
            None => None,
        };
        let store_dir = overrides
            .store_dir
            .clone()
            .or_else(|| lookup(ENV_STORE_DIR).map(PathBuf::from))
            .or_else(|| explicit.as_ref().map(|config| config.store_dir.clone()))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_DIR));

        let mut config = match explicit {
            Some(config) => config,
            None => {
                let implicit = config_path(&store_dir);
                if implicit.is_file() {
                    Self::load_file(&implicit).await?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env(&lookup)?;
        config.apply_overrides(overrides);
        config.store_dir = store_dir;
        Ok(config)
    }

    pub async fn load_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid config JSON in {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn apply_env(&mut self, lookup: &impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(mode) = lookup(ENV_EMBEDDING_MODE) {
            self.embedding.mode = mode
                .parse()
                .with_context(|| format!("Invalid {ENV_EMBEDDING_MODE}"))?;
        }
        if let Some(model) = lookup(ENV_EMBEDDING_MODEL) {
            self.embedding.model_id = Some(model);
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(dimension) = overrides.dimension {
            self.dimension = dimension;
        }
        if let Some(kind) = overrides.index_kind {
            self.index_kind = kind;
        }
        if let Some(nprobe) = overrides.nprobe {
            self.nprobe = nprobe;
        }
        if let Some(mode) = overrides.embed_mode {
            self.embedding.mode = mode;
        }
        if let Some(model) = &overrides.embed_model {
            self.embedding.model_id = Some(model.clone());
        }
    }

    pub fn index_config(&self) -> Result<IndexConfig> {
        let config = IndexConfig::new(self.dimension, self.index_kind)?.with_nprobe(self.nprobe)?;
        Ok(config)
    }

    pub fn embedder(&self, dimension: usize) -> Result<HashEmbedder> {
        let embedder = HashEmbedder::new(self.embedding.mode, dimension)?;
        Ok(match &self.embedding.model_id {
            Some(model) => embedder.with_model_id(model.clone()),
            None => embedder,
        })
    }
}
