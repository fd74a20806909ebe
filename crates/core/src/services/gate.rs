use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::model::{Address, Dataset, REFERENCE_BASELINE_BASE};
use crate::process::ProcessImage;
use crate::services::catalog::{Catalog, CatalogBuilder, CatalogError, CatalogOptions};
use crate::services::fetch::{fetch_with_timeout, DatasetFetcher};
use crate::services::rebase::{RebaseError, Rebaser, SymbolTable};
use crate::store::DatasetCache;

const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// States of the dataset selection state machine.
///
/// `Baked → LocalCached → Remote` are tried in order; the walk stops at the
/// first dataset whose version equals the live version (`Trusted`) or ends in
/// `Unresolved` when none does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    Baked,
    LocalCached,
    Remote,
    Trusted,
    Unresolved,
}

impl GateState {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateState::Baked => "baked",
            GateState::LocalCached => "local_cached",
            GateState::Remote => "remote",
            GateState::Trusted => "trusted",
            GateState::Unresolved => "unresolved",
        }
    }
}

impl fmt::Display for GateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum GateError {
    #[error(transparent)]
    Rebase(#[from] RebaseError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Result of one gate pass: the terminal state and the live table it produced.
#[derive(Debug, Clone)]
pub struct Activation {
    /// `Trusted` or `Unresolved`.
    pub state: GateState,
    /// Stage that supplied the trusted dataset; `None` when unresolved.
    pub source: Option<GateState>,
    pub live_version: String,
    /// Every state visited, terminal state last.
    pub trail: Vec<GateState>,
    /// Set when the table was produced without gating (legacy mode).
    pub legacy: bool,
    pub table: SymbolTable,
}

impl Activation {
    pub fn is_trusted(&self) -> bool {
        self.state == GateState::Trusted
    }

    pub fn address(&self, qualified_name: &str) -> Option<Address> {
        self.table.address(qualified_name)
    }
}

/// Chooses the dataset that is trustworthy for the live process and
/// produces its live symbol table.
pub struct VersionGate {
    baked: Dataset,
    cache: Option<Arc<dyn DatasetCache>>,
    fetcher: Option<Arc<dyn DatasetFetcher>>,
    fetch_timeout: Duration,
    baseline_base: Address,
    options: CatalogOptions,
    legacy: bool,
}

impl VersionGate {
    /// Gate over the compiled-in dataset, with no cache and no fetcher.
    pub fn new(baked: Dataset) -> Self {
        Self {
            baked,
            cache: None,
            fetcher: None,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            baseline_base: REFERENCE_BASELINE_BASE,
            options: CatalogOptions::default(),
            legacy: false,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn DatasetCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn DatasetFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_baseline_base(mut self, baseline_base: Address) -> Self {
        self.baseline_base = baseline_base;
        self
    }

    pub fn with_catalog_options(mut self, options: CatalogOptions) -> Self {
        self.options = options;
        self
    }

    /// Degraded legacy mode: the baked dataset is rebased without a version
    /// check and without inheritance merging.
    pub fn legacy(mut self) -> Self {
        self.legacy = true;
        self.options.merge_inherited = false;
        self
    }

    pub fn baked(&self) -> &Dataset {
        &self.baked
    }

    /// Walk the state machine once for `image`.
    ///
    /// Version mismatches, cache problems, fetch failures and unsound
    /// replacements are absorbed (ending in `Unresolved`); a zero baseline or
    /// a structurally unsound baked dataset is returned as an error.
    pub fn run(&self, image: &ProcessImage) -> Result<Activation, GateError> {
        let rebaser = Rebaser::new(self.baseline_base, image.base)?;
        let live = image.version.as_str();

        if self.legacy {
            warn!(
                version = %self.baked.version,
                live_version = live,
                "legacy mode: rebasing without version check"
            );
            let catalog = self.catalog(&self.baked)?;
            let mut activation = self.trusted(catalog, GateState::Baked, &rebaser, image);
            activation.trail = vec![GateState::Baked, GateState::Trusted];
            activation.legacy = true;
            return Ok(activation);
        }

        let mut trail = vec![GateState::Baked];
        if self.baked.version == live {
            let catalog = self.catalog(&self.baked)?;
            let activation = self.trusted(catalog, GateState::Baked, &rebaser, image);
            return Ok(self.finish(trail, activation));
        }
        debug!(baked = %self.baked.version, live_version = live, "baked dataset does not match");

        trail.push(GateState::LocalCached);
        if let Some(catalog) = self.load_cached(live) {
            let activation = self.trusted(catalog, GateState::LocalCached, &rebaser, image);
            return Ok(self.finish(trail, activation));
        }

        trail.push(GateState::Remote);
        if let Some(catalog) = self.fetch_remote(live) {
            let activation = self.trusted(catalog, GateState::Remote, &rebaser, image);
            return Ok(self.finish(trail, activation));
        }

        let catalog = self.catalog(&self.baked)?;
        let activation = Activation {
            state: GateState::Unresolved,
            source: None,
            live_version: live.to_string(),
            trail: Vec::new(),
            legacy: false,
            table: SymbolTable::neutralized(catalog),
        };
        Ok(self.finish(trail, activation))
    }

    fn catalog(&self, dataset: &Dataset) -> Result<Catalog, CatalogError> {
        CatalogBuilder::new(self.options).build(dataset).ensure_sound()
    }

    fn trusted(
        &self,
        catalog: Catalog,
        source: GateState,
        rebaser: &Rebaser,
        image: &ProcessImage,
    ) -> Activation {
        Activation {
            state: GateState::Trusted,
            source: Some(source),
            live_version: image.version.clone(),
            trail: Vec::new(),
            legacy: false,
            table: rebaser.apply(catalog),
        }
    }

    fn finish(&self, mut trail: Vec<GateState>, mut activation: Activation) -> Activation {
        trail.push(activation.state);
        activation.trail = trail;
        match activation.state {
            GateState::Trusted => info!(
                state = %activation.state,
                source = %activation.source.map(|s| s.as_str()).unwrap_or("none"),
                version = %activation.table.version(),
                entries = activation.table.len(),
                "symbol table activated"
            ),
            _ => warn!(
                state = %activation.state,
                live_version = %activation.live_version,
                entries = activation.table.len(),
                "no dataset matches the live version; addresses neutralized"
            ),
        }
        activation
    }

    /// A cached dataset is only used when it matches and is sound; anything
    /// else falls through to the remote stage.
    fn load_cached(&self, live: &str) -> Option<Catalog> {
        let cache = self.cache.as_ref()?;
        let dataset = match cache.load() {
            Ok(Some(dataset)) if dataset.version == live => dataset,
            Ok(Some(dataset)) => {
                debug!(
                    cached = %dataset.version,
                    live_version = live,
                    "cached dataset does not match"
                );
                return None;
            }
            Ok(None) => {
                debug!("no cached dataset");
                return None;
            }
            Err(err) => {
                warn!(error = %err, "ignoring unreadable cached dataset");
                return None;
            }
        };
        match self.catalog(&dataset) {
            Ok(catalog) => Some(catalog),
            Err(err) => {
                warn!(error = %err, "ignoring unsound cached dataset");
                None
            }
        }
    }

    /// Fetch, parse and check a replacement. It is persisted only once it is
    /// known to match the live version and to be sound.
    fn fetch_remote(&self, live: &str) -> Option<Catalog> {
        let fetcher = self.fetcher.as_ref()?;
        let text = match fetch_with_timeout(Arc::clone(fetcher), live, self.fetch_timeout) {
            Ok(text) => text,
            Err(err) => {
                warn!(fetcher = fetcher.name(), error = %err, "fetch failed");
                return None;
            }
        };
        let dataset = match Dataset::from_yaml_str(&text) {
            Ok(dataset) => dataset,
            Err(err) => {
                warn!(fetcher = fetcher.name(), error = %err, "fetched description is invalid");
                return None;
            }
        };
        if dataset.version != live {
            warn!(
                fetched = %dataset.version,
                live_version = live,
                "fetched dataset does not match"
            );
            return None;
        }
        let catalog = match self.catalog(&dataset) {
            Ok(catalog) => catalog,
            Err(err) => {
                warn!(fetcher = fetcher.name(), error = %err, "fetched dataset is unsound");
                return None;
            }
        };
        if let Some(cache) = &self.cache {
            if let Err(err) = cache.store(&text, &dataset, fetcher.name()) {
                warn!(error = %err, "failed to persist fetched dataset");
            }
        }
        Some(catalog)
    }
}
