use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

use crate::model::{Dataset, DescriptionError};
use crate::store::StoreLayout;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to access cache file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Cached description is unreadable: {0}")]
    Description(#[from] DescriptionError),
    #[error("Invalid cache metadata JSON: {0}")]
    Metadata(#[from] serde_json::Error),
}

/// Sidecar written next to the cached description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub version: String,
    /// SHA-256 of the cached description text.
    pub sha256: String,
    /// RFC 3339 timestamp of when the description was stored.
    pub fetched_at: String,
    /// Name of the fetcher that produced it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Persistent home of the most recently fetched dataset.
pub trait DatasetCache: Send + Sync {
    /// `Ok(None)` when nothing has been cached yet.
    fn load(&self) -> Result<Option<Dataset>, CacheError>;
    /// Replace the cached description with `text` (already parsed as `dataset`).
    fn store(
        &self,
        text: &str,
        dataset: &Dataset,
        source: &str,
    ) -> Result<CacheMetadata, CacheError>;
}

/// Cache backed by two files under `.symbind/cache`.
#[derive(Debug, Clone)]
pub struct FileCache {
    description_path: PathBuf,
    metadata_path: PathBuf,
}

impl FileCache {
    pub fn new(layout: &StoreLayout) -> Self {
        Self {
            description_path: layout.cached_description_path.clone(),
            metadata_path: layout.cached_metadata_path.clone(),
        }
    }

    pub fn description_path(&self) -> &Path {
        &self.description_path
    }

    /// Sidecar of the cached description, if one was written.
    pub fn metadata(&self) -> Result<Option<CacheMetadata>, CacheError> {
        if !self.metadata_path.is_file() {
            return Ok(None);
        }
        let body = read(&self.metadata_path)?;
        Ok(Some(serde_json::from_str(&body)?))
    }
}

impl DatasetCache for FileCache {
    fn load(&self) -> Result<Option<Dataset>, CacheError> {
        if !self.description_path.is_file() {
            return Ok(None);
        }
        let body = read(&self.description_path)?;
        Ok(Some(Dataset::from_yaml_str(&body)?))
    }

    fn store(
        &self,
        text: &str,
        dataset: &Dataset,
        source: &str,
    ) -> Result<CacheMetadata, CacheError> {
        if let Some(dir) = self.description_path.parent() {
            fs::create_dir_all(dir)
                .map_err(|source| CacheError::Io { path: dir.to_path_buf(), source })?;
        }
        write(&self.description_path, text)?;

        let metadata = CacheMetadata {
            version: dataset.version.clone(),
            sha256: fingerprint(text),
            fetched_at: Utc::now().to_rfc3339(),
            source: Some(source.to_string()),
        };
        write(&self.metadata_path, &serde_json::to_string_pretty(&metadata)?)?;
        debug!(
            version = %metadata.version,
            path = %self.description_path.display(),
            "cached description"
        );
        Ok(metadata)
    }
}

/// SHA-256 of a description text, as lowercase hex.
pub fn fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn read(path: &Path) -> Result<String, CacheError> {
    fs::read_to_string(path).map_err(|source| CacheError::Io { path: path.to_path_buf(), source })
}

fn write(path: &Path, body: &str) -> Result<(), CacheError> {
    fs::write(path, body).map_err(|source| CacheError::Io { path: path.to_path_buf(), source })
}
