//! Runtime inputs describing the live process image.
//!
//! Discovering the load address of the main module is left to the host; this
//! module only carries it alongside the build version and knows how to read
//! the version file that ships next to the target executable.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::Address;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Failed to read version file {path}: {source}")]
    VersionFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Version file {0} is empty")]
    EmptyVersion(PathBuf),
    #[error("Failed to locate the current executable: {0}")]
    CurrentExe(#[source] std::io::Error),
}

/// Version file the reference target ships next to its executable.
pub const DEFAULT_VERSION_FILE: &str = "ffxivgame.ver";

/// Live main-module load address and reported build version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessImage {
    pub base: Address,
    pub version: String,
}

impl ProcessImage {
    pub fn new(base: Address, version: impl Into<String>) -> Self {
        Self { base, version: version.into() }
    }

    /// Pair `base` with the version read from `version_file`.
    pub fn from_version_file(base: Address, version_file: &Path) -> Result<Self, ProcessError> {
        Ok(Self::new(base, read_version_file(version_file)?))
    }
}

/// Read a build version file, trimming surrounding whitespace.
pub fn read_version_file(path: &Path) -> Result<String, ProcessError> {
    let body = std::fs::read_to_string(path)
        .map_err(|source| ProcessError::VersionFile { path: path.to_path_buf(), source })?;
    let version = body.trim();
    if version.is_empty() {
        return Err(ProcessError::EmptyVersion(path.to_path_buf()));
    }
    Ok(version.to_string())
}

/// Path of `file_name` in the directory of the running executable.
pub fn beside_current_exe(file_name: &str) -> Result<PathBuf, ProcessError> {
    let exe = std::env::current_exe().map_err(ProcessError::CurrentExe)?;
    let dir = exe.parent().map(Path::to_path_buf).unwrap_or_default();
    Ok(dir.join(file_name))
}
