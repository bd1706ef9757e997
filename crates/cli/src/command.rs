use crate::config::RagConfig;
use anyhow::{Context as AnyhowContext, Result};
use rag_search::{Retriever, SearchError};
use rag_vector_store::{
    index_blob_path, sidecar_path, store_exists, Document, Embedder, Metadata, SharedVectorStore,
    VectorStoreError,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;

#[derive(Debug, Clone, PartialEq)]
pub enum CommandAction {
    Ingest {
        file: PathBuf,
    },
    Search {
        query: String,
        k: Option<usize>,
        threshold: Option<f64>,
    },
    Context {
        query: String,
        k: Option<usize>,
        window: Option<usize>,
    },
    Keyword {
        query: String,
        k: Option<usize>,
    },
    Hybrid {
        query: String,
        k: Option<usize>,
        alpha: Option<f64>,
    },
    Stats,
    Clear,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CommandStatus {
    Ok,
    Error,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct ErrorEnvelope {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct CommandResponse {
    pub status: CommandStatus,
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorEnvelope>,
}

impl CommandResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            status: CommandStatus::Ok,
            data,
            error: None,
        }
    }

    pub fn error(err: &anyhow::Error) -> Self {
        Self {
            status: CommandStatus::Error,
            data: Value::Null,
            error: Some(ErrorEnvelope {
                code: classify_error(err).to_string(),
                message: format!("{err:#}"),
            }),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.status, CommandStatus::Error)
    }
}

/// Stable error code for the first engine error in the chain.
pub fn classify_error(err: &anyhow::Error) -> &'static str {
    for cause in err.chain() {
        if let Some(search) = cause.downcast_ref::<SearchError>() {
            return search.code();
        }
        if let Some(store) = cause.downcast_ref::<VectorStoreError>() {
            return store.code();
        }
    }
    "internal"
}

/// One line of an ingest file.
#[derive(Debug, Deserialize)]
struct IngestRecord {
    text: String,
    #[serde(default)]
    metadata: Option<Metadata>,
    #[serde(default)]
    embedding: Option<Vec<f32>>,
}

pub async fn execute(action: CommandAction, config: &RagConfig) -> CommandResponse {
    match dispatch(action, config).await {
        Ok(data) => CommandResponse::ok(data),
        Err(err) => {
            log::error!("Command failed: {err:#}");
            CommandResponse::error(&err)
        }
    }
}

async fn dispatch(action: CommandAction, config: &RagConfig) -> Result<Value> {
    let defaults = &config.retrieval;
    match action {
        CommandAction::Ingest { file } => ingest(&file, config).await,
        CommandAction::Clear => clear(&config.store_dir).await,
        CommandAction::Search {
            query,
            k,
            threshold,
        } => {
            let retriever = open_retriever(config).await?;
            let response = retriever
                .retrieve(
                    &query,
                    k.unwrap_or(defaults.k),
                    threshold.unwrap_or(defaults.score_threshold),
                )
                .await?;
            Ok(serde_json::to_value(response)?)
        }
        CommandAction::Context { query, k, window } => {
            let retriever = open_retriever(config).await?;
            let response = retriever
                .retrieve_with_context(
                    &query,
                    k.unwrap_or(defaults.k),
                    window.unwrap_or(defaults.context_window),
                )
                .await?;
            Ok(serde_json::to_value(response)?)
        }
        CommandAction::Keyword { query, k } => {
            let retriever = open_retriever(config).await?;
            let response = retriever
                .keyword_search(&query, k.unwrap_or(defaults.k))
                .await?;
            Ok(serde_json::to_value(response)?)
        }
        CommandAction::Hybrid { query, k, alpha } => {
            let retriever = open_retriever(config).await?;
            let response = retriever
                .hybrid_search(
                    &query,
                    k.unwrap_or(defaults.k),
                    alpha.unwrap_or(defaults.alpha),
                )
                .await?;
            Ok(serde_json::to_value(response)?)
        }
        CommandAction::Stats => {
            let retriever = open_retriever(config).await?;
            Ok(serde_json::to_value(retriever.stats().await)?)
        }
    }
}

/// Store saved under `store_dir`, or an empty one built from `config`.
async fn open_store(config: &RagConfig) -> Result<SharedVectorStore> {
    let store = SharedVectorStore::with_config(config.index_config()?);
    if store_exists(&config.store_dir) {
        store
            .load(&config.store_dir)
            .await
            .with_context(|| format!("Failed to load store from {}", config.store_dir.display()))?;
        let loaded = *store.read().await.config();
        if loaded.dimension() != config.dimension || loaded.kind() != config.index_kind {
            log::warn!(
                "Saved store uses {} index of dimension {}; ignoring configured {} / {}",
                loaded.kind(),
                loaded.dimension(),
                config.index_kind,
                config.dimension
            );
        }
    } else {
        log::debug!("No saved store in {}", config.store_dir.display());
    }
    Ok(store)
}

async fn open_retriever(config: &RagConfig) -> Result<Retriever> {
    let store = open_store(config).await?;
    let dimension = store.read().await.config().dimension();
    let embedder = config.embedder(dimension)?;
    Ok(Retriever::new(store, Arc::new(embedder)))
}

async fn ingest(file: &Path, config: &RagConfig) -> Result<Value> {
    let raw = fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let records = parse_records(&raw)?;

    let store = open_store(config).await?;
    let (dimension, first_row) = {
        let guard = store.read().await;
        (guard.config().dimension(), guard.len())
    };
    let embedder = config.embedder(dimension)?;

    let missing: Vec<&str> = records
        .iter()
        .filter(|record| record.embedding.is_none())
        .map(|record| record.text.as_str())
        .collect();
    log::info!(
        "Ingesting {} records ({} to embed with {})",
        records.len(),
        missing.len(),
        embedder.model_id()
    );
    let mut computed = embedder.embed_batch(missing).await?.into_iter();

    let mut documents = Vec::with_capacity(records.len());
    let mut embeddings = Vec::with_capacity(records.len());
    let mut metadata = Vec::with_capacity(records.len());
    for (offset, record) in records.into_iter().enumerate() {
        let embedding = match record.embedding {
            Some(embedding) => embedding,
            None => computed
                .next()
                .context("Embedder returned fewer vectors than requested")?,
        };
        let document = Document::text(record.text);
        metadata.push(
            record
                .metadata
                .unwrap_or_else(|| Metadata::default_for_row(first_row + offset, &document)),
        );
        documents.push(document);
        embeddings.push(embedding);
    }

    let added = store
        .add_documents(documents, embeddings, Some(metadata))
        .await?;
    if added > 0 {
        store.save(&config.store_dir).await?;
    }

    let stats = store.stats().await;
    Ok(json!({
        "added": added,
        "total_documents": stats.total_documents,
        "store_dir": config.store_dir,
    }))
}

fn parse_records(raw: &str) -> Result<Vec<IngestRecord>> {
    raw.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line).with_context(|| format!("Invalid record on line {}", idx + 1))
        })
        .collect()
}

async fn clear(store_dir: &Path) -> Result<Value> {
    let mut removed = Vec::new();
    for path in [index_blob_path(store_dir), sidecar_path(store_dir)] {
        if path.is_file() {
            fs::remove_file(&path)
                .await
                .with_context(|| format!("Failed to remove {}", path.display()))?;
            removed.push(path);
        }
    }
    log::info!("Cleared store in {} ({} files)", store_dir.display(), removed.len());
    Ok(json!({ "cleared": true, "removed": removed }))
}
