use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Address, DEFAULT_POINTER_SIZE, REFERENCE_BASELINE_BASE};
use crate::services::catalog::CatalogOptions;

const CONFIG_VERSION: &str = "0.1.0";
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("baseline_base must be non-zero")]
    ZeroBaseline,
    #[error("pointer_size must be 4 or 8, got {0}")]
    PointerSize(u64),
    #[error("fetch_timeout_secs must be at least 1")]
    ZeroTimeout,
    #[error("fetch_command.program must not be empty")]
    EmptyFetchProgram,
}

/// External command used to fetch a description. `{version}` in any
/// argument is replaced with the requested version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchCommandConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Serializable resolver settings.
///
/// This lives at `.symbind/config.json` under the store root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Schema/config version. This is about the config format, not the dataset version.
    pub config_version: String,
    /// Load address the description's addresses were recorded against.
    #[serde(default = "default_baseline_base")]
    pub baseline_base: Address,
    #[serde(default = "default_pointer_size")]
    pub pointer_size: u64,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// Directory of `<version>.yml` descriptions (relative to the store root or absolute).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mirror_dir: Option<String>,
    /// Takes precedence over `mirror_dir` when both are set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch_command: Option<FetchCommandConfig>,
    /// `false` selects the legacy mode: no inheritance merge, no version gate.
    #[serde(default = "default_merge_inherited")]
    pub merge_inherited: bool,
}

fn default_baseline_base() -> Address {
    REFERENCE_BASELINE_BASE
}

fn default_pointer_size() -> u64 {
    DEFAULT_POINTER_SIZE
}

fn default_fetch_timeout_secs() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}

fn default_merge_inherited() -> bool {
    true
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            config_version: CONFIG_VERSION.to_string(),
            baseline_base: default_baseline_base(),
            pointer_size: default_pointer_size(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            mirror_dir: None,
            fetch_command: None,
            merge_inherited: default_merge_inherited(),
        }
    }
}

impl ResolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style helper to set the recorded baseline.
    pub fn with_baseline_base(mut self, baseline_base: Address) -> Self {
        self.baseline_base = baseline_base;
        self
    }

    /// Builder-style helper to point fetches at a mirror directory.
    pub fn with_mirror_dir(mut self, mirror_dir: Option<String>) -> Self {
        self.mirror_dir = mirror_dir;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.baseline_base == 0 {
            return Err(ConfigError::ZeroBaseline);
        }
        if !matches!(self.pointer_size, 4 | 8) {
            return Err(ConfigError::PointerSize(self.pointer_size));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.fetch_command.as_ref().is_some_and(|c| c.program.trim().is_empty()) {
            return Err(ConfigError::EmptyFetchProgram);
        }
        Ok(())
    }

    pub fn catalog_options(&self) -> CatalogOptions {
        CatalogOptions { pointer_size: self.pointer_size, merge_inherited: self.merge_inherited }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn is_legacy(&self) -> bool {
        !self.merge_inherited
    }
}
