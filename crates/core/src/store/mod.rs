//! On-disk state: resolver configuration and the local dataset cache.
//!
//! - `StoreLayout`: computed paths for the `.symbind` directory.
//! - `ResolverConfig`: serializable resolver settings.
//! - `DatasetCache` / `FileCache`: the previously fetched description.
//! - Helpers to load/save the config and build collaborators from it.

pub mod cache;
pub mod config;
pub mod layout;
pub mod util;

pub use cache::{fingerprint, CacheError, CacheMetadata, DatasetCache, FileCache};
pub use config::{ConfigError, FetchCommandConfig, ResolverConfig};
pub use layout::StoreLayout;
pub use util::{fetcher_from_config, gate_from_config, load_resolver_config, save_resolver_config};
