use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use symbind_core::emit::{emit_table, EmittedSymbol};
use symbind_core::model::Dataset;
use symbind_core::process::{beside_current_exe, ProcessImage, DEFAULT_VERSION_FILE};
use symbind_core::services::{fetch_with_timeout, GateState};
use symbind_core::store::{
    fetcher_from_config, gate_from_config, load_resolver_config, DatasetCache, FileCache,
    StoreLayout,
};
use tracing::{debug, info};

use crate::commands::{load_config_or_default, load_dataset, print_json};
use crate::{canonicalize_or_current, format_address};

/// Inputs of one `resolve` run.
#[derive(Debug, Clone)]
pub struct ResolveRequest {
    pub root: String,
    pub data: String,
    pub live_base: u64,
    pub live_version: Option<String>,
    pub version_file: Option<String>,
    pub json: bool,
}

#[derive(Serialize)]
pub struct ResolveReport {
    pub state: GateState,
    pub source: Option<GateState>,
    pub live_version: String,
    pub dataset_version: String,
    pub live_base: u64,
    pub legacy: bool,
    pub trail: Vec<GateState>,
    pub symbols: Vec<EmittedSymbol>,
}

/// Fetch the description for `version` with the configured fetcher and
/// store it in the local cache.
pub fn fetch_command(root: &str, version: &str) -> Result<()> {
    let root_path = canonicalize_or_current(root)?;
    let layout = StoreLayout::new(&root_path);
    let config = load_resolver_config(&layout)?;
    let fetcher = fetcher_from_config(&layout, &config).ok_or_else(|| {
        anyhow!(
            "No fetcher configured; set mirror_dir or fetch_command in {}",
            layout.config_path.display()
        )
    })?;

    let text = fetch_with_timeout(fetcher.clone(), version, config.fetch_timeout())
        .with_context(|| format!("Failed to fetch description for {version}"))?;
    let dataset = Dataset::from_yaml_str(&text).context("Fetched description is invalid")?;
    if dataset.version != version {
        bail!("Fetched description is for version '{}', expected '{version}'", dataset.version);
    }

    let cache = FileCache::new(&layout);
    let metadata = cache
        .store(&text, &dataset, fetcher.name())
        .context("Failed to cache description")?;
    info!(version, source = fetcher.name(), "cached fetched description");

    println!("Fetched dataset {}:", metadata.version);
    println!("  Source: {}", fetcher.name());
    println!("  SHA-256: {}", metadata.sha256);
    println!("  Cached at: {}", cache.description_path().display());
    Ok(())
}

/// Run the version gate for a live image and print the resulting table.
///
/// Without `--live-version` or `--version-file` the version is read from
/// `ffxivgame.ver` next to the running executable.
pub fn resolve_command(request: &ResolveRequest) -> Result<()> {
    let root_path = canonicalize_or_current(&request.root)?;
    let layout = StoreLayout::new(&root_path);
    let config = load_config_or_default(&layout)?;
    let baked = load_dataset(&request.data)?;

    let image = match (&request.live_version, &request.version_file) {
        (Some(version), _) => ProcessImage::new(request.live_base, version.trim()),
        (None, Some(path)) => ProcessImage::from_version_file(request.live_base, Path::new(path))?,
        (None, None) => {
            let path = beside_current_exe(DEFAULT_VERSION_FILE)?;
            debug!(path = %path.display(), "no version source given; using the executable's");
            ProcessImage::from_version_file(request.live_base, &path)?
        }
    };

    let activation = gate_from_config(&layout, &config, baked)
        .run(&image)
        .context("Failed to activate symbol table")?;

    let report = ResolveReport {
        state: activation.state,
        source: activation.source,
        live_version: activation.live_version.clone(),
        dataset_version: activation.table.version().to_string(),
        live_base: image.base,
        legacy: activation.legacy,
        trail: activation.trail.clone(),
        symbols: emit_table(&activation.table),
    };

    if request.json {
        return print_json(&report);
    }

    let trail: Vec<&str> = report.trail.iter().map(GateState::as_str).collect();
    println!("State: {}", report.state);
    match report.source {
        Some(source) => println!("Source: {source}"),
        None => println!("Source: (none; addresses neutralized)"),
    }
    println!("Live version: {}", report.live_version);
    println!("Dataset version: {}", report.dataset_version);
    println!("Live base: {}", format_address(report.live_base));
    println!("Trail: {}", trail.join(" -> "));
    if report.legacy {
        println!("Mode: legacy (no version check, no inheritance merge)");
    }
    println!("Symbols ({}):", report.symbols.len());
    for symbol in &report.symbols {
        println!("  {} {} [{}]", format_address(symbol.address), symbol.name, symbol.kind.as_str());
    }
    Ok(())
}
