use std::path::{Path, PathBuf};

pub const INDEX_BLOB_FILE: &str = "index.bin";
pub const SIDECAR_FILE: &str = "index.json";
pub const CONFIG_FILE: &str = "config.json";

#[must_use]
pub fn index_blob_path(store_dir: &Path) -> PathBuf {
    store_dir.join(INDEX_BLOB_FILE)
}

#[must_use]
pub fn sidecar_path(store_dir: &Path) -> PathBuf {
    store_dir.join(SIDECAR_FILE)
}

#[must_use]
pub fn config_path(store_dir: &Path) -> PathBuf {
    store_dir.join(CONFIG_FILE)
}

/// True when the index blob of a saved store is present.
#[must_use]
pub fn store_exists(store_dir: &Path) -> bool {
    index_blob_path(store_dir).is_file()
}
