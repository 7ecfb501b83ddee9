use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::domain::DatasetId;
use crate::error::PipelineError;

/// On-disk layout for one pipeline run: per-entity metadata cache files,
/// per-dataset content files and the output artifacts. All paths hang off
/// two explicit roots passed in by the caller, so tests can point the whole
/// store at a tempdir.
#[derive(Debug, Clone)]
pub struct DataDirectory {
    root: Utf8PathBuf,
    public_root: Utf8PathBuf,
}

impl DataDirectory {
    pub fn new(root: Utf8PathBuf, public_root: Utf8PathBuf) -> Self {
        Self { root, public_root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn public_root(&self) -> &Utf8Path {
        &self.public_root
    }

    pub fn metadata_path(&self, entity_id: &str) -> Utf8PathBuf {
        self.root.join("metadata").join(format!("{entity_id}.json"))
    }

    pub fn content_path(&self, id: &DatasetId) -> Utf8PathBuf {
        self.root.join("raw").join(format!("{id}.csv"))
    }

    pub fn artifact_path(&self) -> Utf8PathBuf {
        self.root.join("race_data.csv")
    }

    pub fn public_artifact_path(&self) -> Utf8PathBuf {
        self.public_root.join("data.csv")
    }

    pub fn ensure_root(&self) -> Result<(), PipelineError> {
        fs::create_dir_all(self.root.as_std_path())
            .map_err(|err| PipelineError::Filesystem(err.to_string()))
    }

    pub fn content_exists(&self, id: &DatasetId) -> bool {
        self.content_path(id).as_std_path().exists()
    }

    /// Reads the cached metadata for one entity. Missing or corrupt files
    /// both come back as `None`: the cache self-heals at the cost of one
    /// extra metadata fetch on the next sync.
    pub fn load_metadata(&self, entity_id: &str) -> Option<CachedMetadata> {
        let path = self.metadata_path(entity_id);
        let content = fs::read_to_string(path.as_std_path()).ok()?;
        match serde_json::from_str(&content) {
            Ok(metadata) => Some(metadata),
            Err(err) => {
                warn!("discarding corrupt metadata cache {path}: {err}");
                None
            }
        }
    }

    /// Persists one entity's metadata as an independent file, so a failed
    /// write cannot corrupt any other entity's cache entry.
    pub fn store_metadata(
        &self,
        entity_id: &str,
        metadata: &CachedMetadata,
    ) -> Result<(), PipelineError> {
        let path = self.metadata_path(entity_id);
        let content = serde_json::to_vec_pretty(metadata)
            .map_err(|err| PipelineError::Filesystem(err.to_string()))?;
        Self::write_bytes_atomic(&path, &content)
    }

    pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), PipelineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| PipelineError::Filesystem(err.to_string()))?;
        }
        let tmp_path = path.with_extension("tmp");
        fs::write(tmp_path.as_std_path(), content)
            .map_err(|err| PipelineError::Filesystem(err.to_string()))?;
        fs::rename(tmp_path.as_std_path(), path.as_std_path())
            .map_err(|err| PipelineError::Filesystem(err.to_string()))?;
        Ok(())
    }

    pub fn copy_file_atomic(source: &Utf8Path, dest: &Utf8Path) -> Result<(), PipelineError> {
        let parent = dest
            .parent()
            .ok_or_else(|| PipelineError::Filesystem("invalid destination path".to_string()))?;
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| PipelineError::Filesystem(err.to_string()))?;
        let temp = tempfile::Builder::new()
            .prefix("resale-race-file")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| PipelineError::Filesystem(err.to_string()))?;
        fs::copy(source.as_std_path(), temp.path())
            .map_err(|err| PipelineError::Filesystem(err.to_string()))?;
        if dest.as_std_path().exists() {
            fs::remove_file(dest.as_std_path())
                .map_err(|err| PipelineError::Filesystem(err.to_string()))?;
        }
        temp.persist(dest.as_std_path())
            .map_err(|err| PipelineError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

/// Cached view of one remote entity (collection or dataset). The version
/// token is compared by string equality only; the raw payload is kept for
/// debugging stale-sync reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedMetadata {
    pub entity_id: String,
    pub last_updated_at: String,
    pub checked_at: String,
    pub raw: Value,
}

impl CachedMetadata {
    pub fn new(entity_id: &str, last_updated_at: &str, raw: Value) -> Self {
        Self {
            entity_id: entity_id.to_string(),
            last_updated_at: last_updated_at.to_string(),
            checked_at: chrono::Utc::now().to_rfc3339(),
            raw,
        }
    }
}
