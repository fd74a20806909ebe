use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::model::{Address, SymbolEntry};
use crate::services::catalog::Catalog;

pub use crate::model::UNRESOLVED_ADDRESS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RebaseError {
    #[error("Baseline base address is zero; refusing to translate recorded addresses")]
    ZeroBaseline,
}

/// `recorded - baseline + live`, in wrapping 64-bit arithmetic.
///
/// Only meaningful on an address as recorded in the description. Feeding an
/// already translated address back in shifts it a second time.
pub fn translate(
    recorded: Address,
    baseline: Address,
    live: Address,
) -> Result<Address, RebaseError> {
    if baseline == 0 {
        return Err(RebaseError::ZeroBaseline);
    }
    Ok(recorded.wrapping_sub(baseline).wrapping_add(live))
}

/// A validated (baseline, live) base pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rebaser {
    baseline: Address,
    live: Address,
}

impl Rebaser {
    pub fn new(baseline: Address, live: Address) -> Result<Self, RebaseError> {
        if baseline == 0 {
            return Err(RebaseError::ZeroBaseline);
        }
        Ok(Self { baseline, live })
    }

    pub fn translate(&self, recorded: Address) -> Address {
        recorded.wrapping_sub(self.baseline).wrapping_add(self.live)
    }

    /// Consume a catalog and produce the live table. Each entry is translated
    /// exactly once, from its recorded address.
    pub fn apply(&self, catalog: Catalog) -> SymbolTable {
        let (version, mut entries) = catalog.into_entries();
        for entry in &mut entries {
            entry.resolved_address = self.translate(entry.recorded_address);
        }
        debug!(
            version = %version,
            entries = entries.len(),
            baseline = self.baseline,
            live = self.live,
            "rebased catalog"
        );
        let mode = AddressMode::Rebased { baseline: self.baseline, live: self.live };
        SymbolTable::new(version, mode, entries)
    }
}

/// How the `resolved_address` values of a table were produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum AddressMode {
    Rebased { baseline: Address, live: Address },
    /// Every address is [`UNRESOLVED_ADDRESS`].
    Neutralized,
}

/// Live symbol table for one dataset activation. Read-only once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolTable {
    version: String,
    mode: AddressMode,
    entries: Vec<SymbolEntry>,
    by_name: HashMap<String, usize>,
}

impl SymbolTable {
    fn new(version: String, mode: AddressMode, entries: Vec<SymbolEntry>) -> Self {
        let by_name =
            entries.iter().enumerate().map(|(i, e)| (e.qualified_name.clone(), i)).collect();
        Self { version, mode, entries, by_name }
    }

    /// Fail-safe table: same entries as `catalog`, all set to the sentinel.
    pub fn neutralized(catalog: Catalog) -> Self {
        let (version, mut entries) = catalog.into_entries();
        for entry in &mut entries {
            entry.resolved_address = UNRESOLVED_ADDRESS;
        }
        debug!(version = %version, entries = entries.len(), "neutralized catalog");
        Self::new(version, AddressMode::Neutralized, entries)
    }

    /// Version of the dataset the entries were built from.
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn mode(&self) -> AddressMode {
        self.mode
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.mode, AddressMode::Rebased { .. })
    }

    pub fn entries(&self) -> &[SymbolEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, qualified_name: &str) -> Option<&SymbolEntry> {
        self.by_name.get(qualified_name).map(|&i| &self.entries[i])
    }

    /// Live address of `qualified_name`, or `None` if it is not catalogued.
    pub fn address(&self, qualified_name: &str) -> Option<Address> {
        self.get(qualified_name).map(|e| e.resolved_address)
    }

    /// Entries declared under `source_name` exactly as written in the description.
    pub fn by_source<'t>(&'t self, source_name: &'t str) -> impl Iterator<Item = &'t SymbolEntry> {
        self.entries.iter().filter(move |e| e.source_name == source_name)
    }
}
