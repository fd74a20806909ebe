use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use symbind_core::model::Dataset;
use symbind_core::store::{load_resolver_config, ResolverConfig, StoreLayout};
use tracing::debug;

/// Read a description file (YAML, or JSON by extension).
pub fn load_dataset(path: &str) -> Result<Dataset> {
    Dataset::from_path(Path::new(path))
        .with_context(|| format!("Failed to load description at {path}"))
}

/// Resolver config for `layout`, or the defaults when `init` was never run.
/// A config that exists but cannot be read is still an error.
pub fn load_config_or_default(layout: &StoreLayout) -> Result<ResolverConfig> {
    if layout.config_path.exists() {
        load_resolver_config(layout)
    } else {
        debug!(path = %layout.config_path.display(), "no resolver config; using defaults");
        Ok(ResolverConfig::new())
    }
}

/// Helper to print whether a directory exists.
pub fn print_dir_status(label: &str, path: &Path) {
    let exists = path.is_dir();
    println!("- {label}: {} ({})", if exists { "OK" } else { "MISSING" }, path.display());
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let serialized = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
    println!("{serialized}");
    Ok(())
}
