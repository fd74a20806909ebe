use std::sync::Arc;

use anyhow::{Context, Result};

use crate::model::Dataset;
use crate::services::fetch::{CommandFetcher, DatasetFetcher, MirrorFetcher};
use crate::services::gate::VersionGate;
use crate::store::{FileCache, ResolverConfig, StoreLayout};

/// Load the resolver config JSON from disk for a given layout.
pub fn load_resolver_config(layout: &StoreLayout) -> Result<ResolverConfig> {
    let config_json = std::fs::read_to_string(&layout.config_path).with_context(|| {
        format!("Failed to read resolver config at {}", layout.config_path.display())
    })?;
    let config: ResolverConfig =
        serde_json::from_str(&config_json).context("Failed to parse resolver config JSON")?;
    config.validate().context("Invalid resolver config")?;
    Ok(config)
}

/// Write the resolver config, creating the meta dir if needed.
pub fn save_resolver_config(layout: &StoreLayout, config: &ResolverConfig) -> Result<()> {
    config.validate().context("Refusing to write invalid resolver config")?;
    std::fs::create_dir_all(&layout.meta_dir)
        .with_context(|| format!("Failed to create meta dir: {}", layout.meta_dir.display()))?;
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&layout.config_path, json).with_context(|| {
        format!("Failed to write resolver config: {}", layout.config_path.display())
    })?;
    Ok(())
}

/// Fetcher described by the config, if any. A fetch command wins over a mirror.
pub fn fetcher_from_config(
    layout: &StoreLayout,
    config: &ResolverConfig,
) -> Option<Arc<dyn DatasetFetcher>> {
    if let Some(cmd) = &config.fetch_command {
        return Some(Arc::new(CommandFetcher::new(cmd.program.clone(), cmd.args.clone())));
    }
    let dir = config.mirror_dir.as_deref()?;
    Some(Arc::new(MirrorFetcher::new(layout.resolve_relative(dir))))
}

/// Assemble a gate over `baked` with the cache and fetcher the config describes.
pub fn gate_from_config(
    layout: &StoreLayout,
    config: &ResolverConfig,
    baked: Dataset,
) -> VersionGate {
    let mut gate = VersionGate::new(baked)
        .with_baseline_base(config.baseline_base)
        .with_catalog_options(config.catalog_options())
        .with_fetch_timeout(config.fetch_timeout())
        .with_cache(Arc::new(FileCache::new(layout)));
    if let Some(fetcher) = fetcher_from_config(layout, config) {
        gate = gate.with_fetcher(fetcher);
    }
    if config.is_legacy() {
        gate = gate.legacy();
    }
    gate
}
