use anyhow::{Context, Result};
use serde::Serialize;
use symbind_core::store::{
    load_resolver_config, save_resolver_config, CacheMetadata, FileCache, ResolverConfig,
    StoreLayout,
};

use crate::canonicalize_or_current;
use crate::commands::{print_dir_status, print_json};
use crate::format_address;

#[derive(Serialize)]
pub struct StoreInfoSnapshot {
    pub root: String,
    pub config_file: String,
    pub config: ResolverConfig,
    pub layout: StoreInfoLayout,
    pub cache: Option<CacheMetadata>,
}

#[derive(Serialize)]
pub struct StoreInfoLayout {
    pub meta_dir: String,
    pub cache_dir: String,
    pub cached_description: String,
}

/// Create `.symbind/` under `root` and write the resolver config.
pub fn init_command(
    root: &str,
    baseline_base: Option<u64>,
    mirror_dir: Option<String>,
) -> Result<()> {
    let root_path = canonicalize_or_current(root)?;
    let layout = StoreLayout::new(&root_path);

    std::fs::create_dir_all(&layout.cache_dir)
        .with_context(|| format!("Failed to create cache dir: {}", layout.cache_dir.display()))?;

    let mut config = ResolverConfig::new().with_mirror_dir(mirror_dir);
    if let Some(base) = baseline_base {
        config = config.with_baseline_base(base);
    }
    save_resolver_config(&layout, &config)?;

    println!("Initialized symbind store:");
    println!("  Root: {}", layout.root.display());
    println!("  Config: {}", layout.config_path.display());
    println!("  Baseline base: {}", format_address(config.baseline_base));
    if let Some(dir) = &config.mirror_dir {
        println!("  Mirror dir: {}", layout.resolve_relative(dir).display());
    }
    println!("  Cache dir: {}", layout.cache_dir.display());

    Ok(())
}

/// Show the resolver config and the state of the local cache.
pub fn info_command(root: &str, json: bool) -> Result<()> {
    let root_path = canonicalize_or_current(root)?;
    let layout = StoreLayout::new(&root_path);
    let config = load_resolver_config(&layout)?;
    let cache = FileCache::new(&layout)
        .metadata()
        .context("Failed to read cache metadata")?;

    if json {
        return print_json(&StoreInfoSnapshot {
            root: layout.root.display().to_string(),
            config_file: layout.config_path.display().to_string(),
            config,
            layout: StoreInfoLayout {
                meta_dir: layout.meta_dir.display().to_string(),
                cache_dir: layout.cache_dir.display().to_string(),
                cached_description: layout.cached_description_path.display().to_string(),
            },
            cache,
        });
    }

    println!("symbind Store Info");
    println!("==================");
    println!("Root: {}", layout.root.display());
    println!("Config file: {}", layout.config_path.display());
    println!("Config version: {}", config.config_version);
    println!("Baseline base: {}", format_address(config.baseline_base));
    println!("Pointer size: {}", config.pointer_size);
    println!("Fetch timeout: {}s", config.fetch_timeout_secs);
    println!("Inheritance merge: {}", if config.merge_inherited { "on" } else { "off (legacy)" });
    match (&config.fetch_command, &config.mirror_dir) {
        (Some(cmd), _) => println!("Fetcher: command `{} {}`", cmd.program, cmd.args.join(" ")),
        (None, Some(dir)) => println!("Fetcher: mirror {}", layout.resolve_relative(dir).display()),
        (None, None) => println!("Fetcher: (none)"),
    }
    println!();

    println!("Directories:");
    print_dir_status("Meta dir (.symbind)", &layout.meta_dir);
    print_dir_status("Cache dir", &layout.cache_dir);
    println!();

    match cache {
        Some(meta) => {
            println!("Cached dataset: {}", meta.version);
            println!("  SHA-256: {}", meta.sha256);
            println!("  Fetched at: {}", meta.fetched_at);
            if let Some(source) = meta.source {
                println!("  Source: {source}");
            }
        }
        None => println!("Cached dataset: (none)"),
    }

    Ok(())
}
