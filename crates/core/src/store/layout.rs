use std::path::{Path, PathBuf};

/// Logical layout of resolver state on disk.
///
/// This is derived from a chosen root path. It does *not* perform any IO itself.
#[derive(Debug, Clone)]
pub struct StoreLayout {
    /// Root directory (typically the directory of the host executable).
    pub root: PathBuf,
    /// Directory for internal metadata (.symbind).
    pub meta_dir: PathBuf,
    /// Path to the resolver config file (JSON).
    pub config_path: PathBuf,
    /// Directory holding the locally cached dataset.
    pub cache_dir: PathBuf,
    /// Raw text of the most recently fetched description.
    pub cached_description_path: PathBuf,
    /// Sidecar describing the cached description (version, hash, fetch time).
    pub cached_metadata_path: PathBuf,
}

impl StoreLayout {
    /// Compute the default layout rooted at `root`.
    ///
    /// This does *not* touch the filesystem.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        let meta_dir = root.join(".symbind");
        let config_path = meta_dir.join("config.json");
        let cache_dir = meta_dir.join("cache");
        let cached_description_path = cache_dir.join("dataset.yml");
        let cached_metadata_path = cache_dir.join("dataset.meta.json");

        Self {
            root,
            meta_dir,
            config_path,
            cache_dir,
            cached_description_path,
            cached_metadata_path,
        }
    }

    /// Resolve a config-relative path (e.g. `mirror_dir`) against the root.
    pub fn resolve_relative(&self, path: &str) -> PathBuf {
        let candidate = Path::new(path);
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.root.join(candidate)
        }
    }
}
