//! Two-part on-disk format: a bincode index blob plus a JSON sidecar holding
//! the documents and store-level fields. Both are written atomically
//! (temp file + rename) and cross-checked on load.

use crate::documents::DocumentStore;
use crate::error::{Result, VectorStoreError};
use crate::index::{FlatIndex, IndexBackend, IvfIndex, VectorIndex};
use crate::paths::{index_blob_path, sidecar_path};
use crate::store::VectorStore;
use crate::types::{Document, IndexConfig, IndexKind};
use bincode::Options;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const SIDECAR_SCHEMA_VERSION: u32 = 1;

const INDEX_MAGIC: &[u8; 4] = b"RVI1";

#[derive(Serialize)]
struct SidecarRef<'a> {
    schema_version: u32,
    dimension: usize,
    index_kind: IndexKind,
    is_trained: bool,
    nprobe: usize,
    entries: &'a [Document],
}

#[derive(Deserialize)]
struct Sidecar {
    schema_version: u32,
    dimension: usize,
    index_kind: IndexKind,
    is_trained: bool,
    #[serde(default = "default_nprobe")]
    nprobe: usize,
    entries: Vec<Document>,
}

const fn default_nprobe() -> usize {
    crate::types::DEFAULT_NPROBE
}

/// Borrowed view of an index, written after [`INDEX_MAGIC`].
#[derive(Serialize)]
struct IndexBlobRef<'a> {
    kind: IndexKind,
    dimension: usize,
    nprobe: Option<usize>,
    trained: bool,
    vectors: &'a Array2<f32>,
    centroids: Option<&'a Array2<f32>>,
    lists: &'a [Vec<usize>],
}

/// Owned counterpart of [`IndexBlobRef`]; the field order must match.
#[derive(Deserialize)]
struct IndexBlob {
    kind: IndexKind,
    dimension: usize,
    nprobe: Option<usize>,
    trained: bool,
    vectors: Array2<f32>,
    centroids: Option<Array2<f32>>,
    lists: Vec<Vec<usize>>,
}

fn blob_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .reject_trailing_bytes()
}

/// Serialize `store` into `dir` (created if missing).
pub async fn save(store: &VectorStore, dir: impl AsRef<Path>) -> Result<()> {
    let dir = dir.as_ref();
    let index = store.index().ok_or(VectorStoreError::NotInitialized)?;
    log::info!("Saving vector store to {}", dir.display());

    tokio::fs::create_dir_all(dir).await?;
    let blob = encode_index(index)?;
    let sidecar = SidecarRef {
        schema_version: SIDECAR_SCHEMA_VERSION,
        dimension: store.config().dimension(),
        index_kind: store.config().kind(),
        is_trained: index.is_trained(),
        nprobe: store.config().nprobe(),
        entries: store.document_store().as_slice(),
    };
    let sidecar = serde_json::to_vec_pretty(&sidecar)?;

    write_atomic(&index_blob_path(dir), &blob).await?;
    write_atomic(&sidecar_path(dir), &sidecar).await?;
    log::info!("Vector store saved ({} documents)", store.len());
    Ok(())
}

/// Reconstruct a store previously written by [`save`].
pub async fn load(dir: impl AsRef<Path>) -> Result<VectorStore> {
    let dir = dir.as_ref();
    log::info!("Loading vector store from {}", dir.display());

    let blob = read_part(&index_blob_path(dir)).await?;
    let sidecar = read_part(&sidecar_path(dir)).await?;
    let sidecar: Sidecar = serde_json::from_slice(&sidecar)
        .map_err(|err| corrupt(format!("unreadable sidecar: {err}")))?;
    if sidecar.schema_version != SIDECAR_SCHEMA_VERSION {
        return Err(corrupt(format!(
            "unsupported sidecar schema_version {} (expected {SIDECAR_SCHEMA_VERSION})",
            sidecar.schema_version
        )));
    }

    let index = decode_index(&blob)?;
    if index.dimension() != sidecar.dimension {
        return Err(corrupt(format!(
            "index dimension {} does not match sidecar dimension {}",
            index.dimension(),
            sidecar.dimension
        )));
    }
    if index.kind() != sidecar.index_kind {
        return Err(corrupt(format!(
            "index kind {} does not match sidecar kind {}",
            index.kind(),
            sidecar.index_kind
        )));
    }
    if let IndexBackend::Ivf(ivf) = &index {
        if ivf.nprobe() != sidecar.nprobe {
            return Err(corrupt(format!(
                "index nprobe {} does not match sidecar nprobe {}",
                ivf.nprobe(),
                sidecar.nprobe
            )));
        }
    }
    if index.is_trained() != sidecar.is_trained {
        return Err(corrupt("trained flag differs between index and sidecar"));
    }
    if index.len() != sidecar.entries.len() {
        return Err(corrupt(format!(
            "index holds {} rows but sidecar lists {} documents",
            index.len(),
            sidecar.entries.len()
        )));
    }

    let config = IndexConfig::new(sidecar.dimension, sidecar.index_kind)
        .and_then(|cfg| cfg.with_nprobe(sidecar.nprobe))
        .map_err(|err| corrupt(format!("invalid stored configuration: {err}")))?;
    let store = VectorStore::from_parts(config, index, DocumentStore::from_rows(sidecar.entries));
    log::info!("Loaded {} documents", store.len());
    Ok(store)
}

async fn read_part(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .map_err(|err| corrupt(format!("cannot read {}: {err}", path.display())))
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, bytes).await?;
    if let Err(err) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(err.into());
    }
    Ok(())
}

fn corrupt(message: impl Into<String>) -> VectorStoreError {
    VectorStoreError::PersistenceCorrupt(message.into())
}

/// Encode an index as [`INDEX_MAGIC`] followed by a bincode payload.
/// Floats are stored bit-exact.
pub fn encode_index(index: &IndexBackend) -> Result<Vec<u8>> {
    let blob = match index {
        IndexBackend::Flat(flat) => IndexBlobRef {
            kind: IndexKind::Flat,
            dimension: flat.dimension(),
            nprobe: None,
            trained: flat.is_trained(),
            vectors: flat.vectors(),
            centroids: None,
            lists: &[],
        },
        IndexBackend::Ivf(ivf) => IndexBlobRef {
            kind: IndexKind::Ivf,
            dimension: ivf.dimension(),
            nprobe: Some(ivf.nprobe()),
            trained: ivf.is_trained(),
            vectors: ivf.vectors(),
            centroids: ivf.centroids(),
            lists: ivf.lists(),
        },
    };
    let mut out = INDEX_MAGIC.to_vec();
    out.extend(blob_options().serialize(&blob)?);
    Ok(out)
}

/// Inverse of [`encode_index`]; any structural problem is `PersistenceCorrupt`.
pub fn decode_index(bytes: &[u8]) -> Result<IndexBackend> {
    let payload = bytes
        .strip_prefix(INDEX_MAGIC.as_slice())
        .ok_or_else(|| corrupt("index blob has an unknown header"))?;
    let blob: IndexBlob = blob_options()
        .deserialize(payload)
        .map_err(|err| corrupt(format!("unreadable index blob: {err}")))?;

    if blob.dimension == 0 {
        return Err(corrupt("index blob declares zero dimension"));
    }
    if blob.vectors.ncols() != blob.dimension {
        return Err(corrupt(format!(
            "index rows have {} columns but the blob declares dimension {}",
            blob.vectors.ncols(),
            blob.dimension
        )));
    }

    match blob.kind {
        IndexKind::Flat => {
            if blob.trained || blob.nprobe.is_some() || blob.centroids.is_some() {
                return Err(corrupt("flat index blob carries clustering state"));
            }
            if !blob.lists.is_empty() {
                return Err(corrupt("flat index blob carries inverted lists"));
            }
            Ok(IndexBackend::Flat(FlatIndex::from_vectors(blob.vectors)))
        }
        IndexKind::Ivf => decode_ivf(blob).map(IndexBackend::Ivf),
    }
}

fn decode_ivf(blob: IndexBlob) -> Result<IvfIndex> {
    let nprobe = match blob.nprobe {
        Some(nprobe) if nprobe > 0 => nprobe,
        _ => return Err(corrupt("clustered index blob has no valid nprobe")),
    };
    if blob.trained != blob.centroids.is_some() || blob.trained == blob.lists.is_empty() {
        return Err(corrupt("clustered index trained flag disagrees with its lists"));
    }
    if let Some(centroids) = &blob.centroids {
        if centroids.dim() != (blob.lists.len(), blob.dimension) {
            return Err(corrupt(format!(
                "centroid matrix is {:?} for {} lists of dimension {}",
                centroids.dim(),
                blob.lists.len(),
                blob.dimension
            )));
        }
    }

    let rows = blob.vectors.nrows();
    let mut listed = vec![false; rows];
    for &row in blob.lists.iter().flatten() {
        match listed.get_mut(row) {
            Some(seen) if !*seen => *seen = true,
            Some(_) => return Err(corrupt(format!("row {row} appears in two inverted lists"))),
            None => {
                return Err(corrupt(format!("inverted list references row {row} of {rows}")))
            }
        }
    }
    if let Some(missing) = listed.iter().position(|seen| !seen) {
        return Err(corrupt(format!("row {missing} is missing from every inverted list")));
    }

    Ok(IvfIndex::from_parts(nprobe, blob.centroids, blob.lists, blob.vectors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Metadata;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn flat_store() -> VectorStore {
        let mut store = VectorStore::new(IndexConfig::flat(2).unwrap());
        store
            .add_documents(
                vec![
                    Document::text("cat on mat"),
                    Document::text("dog in fog"),
                    Document::text("cat and dog"),
                ],
                vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.5, 0.5]],
                None,
            )
            .unwrap();
        store
    }

    fn ivf_store() -> VectorStore {
        let mut store = VectorStore::new(IndexConfig::ivf(3).unwrap().with_nprobe(2).unwrap());
        let documents = (0..50)
            .map(|i| {
                Document::new(
                    format!("row {i}"),
                    Metadata::new().with("source", "s").with("page", i),
                )
            })
            .collect();
        let vectors = (0..50)
            .map(|i| vec![(i % 7) as f32 * 0.3, (i % 5) as f32 * 1.1, i as f32 / 13.0])
            .collect();
        store
            .add_documents(documents, vectors, None)
            .unwrap();
        store
    }

    fn assert_same_answers(a: &VectorStore, b: &VectorStore, queries: &[Vec<f32>]) {
        assert_eq!(a.stats(), b.stats());
        let a_docs: Vec<&Document> = a.documents().collect();
        let b_docs: Vec<&Document> = b.documents().collect();
        assert_eq!(a_docs, b_docs);
        for query in queries {
            assert_eq!(a.search(query, 5).unwrap(), b.search(query, 5).unwrap());
        }
    }

    #[tokio::test]
    async fn flat_round_trip() {
        let tmp = TempDir::new().unwrap();
        let store = flat_store();
        save(&store, tmp.path()).await.unwrap();
        let loaded = load(tmp.path()).await.unwrap();
        assert_same_answers(&store, &loaded, &[vec![1.0, 0.0], vec![0.2, 0.9]]);
    }

    #[tokio::test]
    async fn ivf_round_trip() {
        let tmp = TempDir::new().unwrap();
        let store = ivf_store();
        save(&store, tmp.path()).await.unwrap();
        let loaded = load(tmp.path()).await.unwrap();
        assert_eq!(loaded.config().nprobe(), 2);
        assert_same_answers(
            &store,
            &loaded,
            &[vec![0.0, 0.0, 0.0], vec![1.2, 3.3, 2.0], vec![0.6, 1.1, 3.5]],
        );
    }

    #[test]
    fn blob_is_bit_exact() {
        let store = ivf_store();
        let index = store.index().unwrap();
        let blob = encode_index(index).unwrap();
        let decoded = decode_index(&blob).unwrap();
        assert_eq!(encode_index(&decoded).unwrap(), blob);
    }

    #[tokio::test]
    async fn saving_uninitialized_store_fails() {
        let tmp = TempDir::new().unwrap();
        let store = VectorStore::new(IndexConfig::flat(2).unwrap());
        assert!(matches!(
            save(&store, tmp.path()).await,
            Err(VectorStoreError::NotInitialized)
        ));
    }

    #[tokio::test]
    async fn missing_sidecar_is_corrupt() {
        let tmp = TempDir::new().unwrap();
        save(&flat_store(), tmp.path()).await.unwrap();
        tokio::fs::remove_file(sidecar_path(tmp.path())).await.unwrap();
        assert!(matches!(
            load(tmp.path()).await,
            Err(VectorStoreError::PersistenceCorrupt(_))
        ));
    }

    #[tokio::test]
    async fn missing_blob_is_corrupt() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            load(tmp.path()).await,
            Err(VectorStoreError::PersistenceCorrupt(_))
        ));
    }

    #[tokio::test]
    async fn mismatched_parts_are_corrupt() {
        let flat_dir = TempDir::new().unwrap();
        let ivf_dir = TempDir::new().unwrap();
        save(&flat_store(), flat_dir.path()).await.unwrap();
        save(&ivf_store(), ivf_dir.path()).await.unwrap();
        tokio::fs::copy(sidecar_path(ivf_dir.path()), sidecar_path(flat_dir.path()))
            .await
            .unwrap();
        assert!(matches!(
            load(flat_dir.path()).await,
            Err(VectorStoreError::PersistenceCorrupt(_))
        ));
    }

    #[test]
    fn truncated_blob_is_corrupt() {
        let blob = encode_index(flat_store().index().unwrap()).unwrap();
        for cut in [0, 3, 10, blob.len() - 1] {
            assert!(matches!(
                decode_index(&blob[..cut]),
                Err(VectorStoreError::PersistenceCorrupt(_))
            ));
        }
        let mut bad = blob.clone();
        bad[0] = b'X';
        assert!(decode_index(&bad).is_err());
    }

    #[test]
    fn trailing_bytes_are_corrupt() {
        let mut blob = encode_index(flat_store().index().unwrap()).unwrap();
        blob.push(0);
        assert!(matches!(
            decode_index(&blob),
            Err(VectorStoreError::PersistenceCorrupt(_))
        ));
    }

    #[tokio::test]
    async fn flat_store_persists_untrained() {
        let tmp = TempDir::new().unwrap();
        save(&flat_store(), tmp.path()).await.unwrap();
        let sidecar: serde_json::Value =
            serde_json::from_slice(&tokio::fs::read(sidecar_path(tmp.path())).await.unwrap())
                .unwrap();
        assert_eq!(sidecar["is_trained"], false);

        let loaded = load(tmp.path()).await.unwrap();
        assert!(!loaded.stats().is_trained);
    }

    async fn rewrite_sidecar(dir: &Path, field: &str, value: serde_json::Value) {
        let path = sidecar_path(dir);
        let mut sidecar: serde_json::Value =
            serde_json::from_slice(&tokio::fs::read(&path).await.unwrap()).unwrap();
        sidecar[field] = value;
        tokio::fs::write(&path, serde_json::to_vec(&sidecar).unwrap())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn nprobe_disagreement_is_corrupt() {
        let tmp = TempDir::new().unwrap();
        save(&ivf_store(), tmp.path()).await.unwrap();
        rewrite_sidecar(tmp.path(), "nprobe", serde_json::json!(5)).await;
        let err = load(tmp.path()).await.unwrap_err();
        assert!(
            matches!(&err, VectorStoreError::PersistenceCorrupt(msg) if msg.contains("nprobe")),
            "{err}"
        );
    }

    #[tokio::test]
    async fn trained_flag_disagreement_is_corrupt() {
        let tmp = TempDir::new().unwrap();
        save(&flat_store(), tmp.path()).await.unwrap();
        rewrite_sidecar(tmp.path(), "is_trained", serde_json::json!(true)).await;
        assert!(matches!(
            load(tmp.path()).await,
            Err(VectorStoreError::PersistenceCorrupt(_))
        ));
    }

    #[test]
    fn flat_blob_with_trained_flag_is_corrupt() {
        let vectors = Array2::<f32>::zeros((2, 2));
        let blob = IndexBlobRef {
            kind: IndexKind::Flat,
            dimension: 2,
            nprobe: None,
            trained: true,
            vectors: &vectors,
            centroids: None,
            lists: &[],
        };
        let mut bytes = INDEX_MAGIC.to_vec();
        bytes.extend(blob_options().serialize(&blob).unwrap());
        assert!(matches!(
            decode_index(&bytes),
            Err(VectorStoreError::PersistenceCorrupt(_))
        ));
    }

    #[test]
    fn ivf_blob_with_duplicate_row_is_corrupt() {
        let store = ivf_store();
        let Some(IndexBackend::Ivf(ivf)) = store.index() else {
            panic!("expected clustered index");
        };
        let mut lists = ivf.lists().to_vec();
        let first = lists.iter().position(|list| !list.is_empty()).unwrap();
        let row = lists[first][0];
        let n_lists = lists.len();
        lists[(first + 1) % n_lists].push(row);
        let blob = IndexBlobRef {
            kind: IndexKind::Ivf,
            dimension: ivf.dimension(),
            nprobe: Some(ivf.nprobe()),
            trained: true,
            vectors: ivf.vectors(),
            centroids: ivf.centroids(),
            lists: &lists,
        };
        let mut bytes = INDEX_MAGIC.to_vec();
        bytes.extend(blob_options().serialize(&blob).unwrap());
        assert!(matches!(
            decode_index(&bytes),
            Err(VectorStoreError::PersistenceCorrupt(_))
        ));
    }
}
