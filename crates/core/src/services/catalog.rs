use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::{
    Address, ClassDescriptor, Dataset, Scope, SymbolEntry, SymbolKind, DEFAULT_POINTER_SIZE,
    UNRESOLVED_ADDRESS,
};
use crate::services::inheritance::{InheritanceResolver, ResolveError, SlotMap};

/// Options controlling how a dataset is flattened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogOptions {
    pub pointer_size: u64,
    /// When false, classes keep only their explicit slots (legacy behavior).
    pub merge_inherited: bool,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self { pointer_size: DEFAULT_POINTER_SIZE, merge_inherited: true }
    }
}

/// Structural problem that kept some declarations out of the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogIssue {
    #[error("Lineage of class '{class}' rejected: {source}")]
    Lineage {
        class: String,
        #[source]
        source: ResolveError,
    },
    #[error("Class '{class}' has malformed vtable slot {index}: {reason}")]
    MalformedSlot { class: String, index: i64, reason: String },
    #[error("Class '{class}' shares scope '{scope}' with class '{existing}'")]
    ScopeCollision { class: String, existing: String, scope: String },
    #[error("Symbol '{source_name}' in scope '{scope}' has no usable identifier characters")]
    UnnamedSymbol { scope: String, source_name: String },
}

impl CatalogIssue {
    /// Class whose entries were withheld, if the issue is class-scoped.
    pub fn class(&self) -> Option<&str> {
        match self {
            CatalogIssue::Lineage { class, .. }
            | CatalogIssue::MalformedSlot { class, .. }
            | CatalogIssue::ScopeCollision { class, .. } => Some(class),
            CatalogIssue::UnnamedSymbol { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error(
        "Dataset '{version}' is structurally unsound ({} issue(s)): {}",
        issues.len(),
        issues.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
    )]
    Unsound { version: String, issues: Vec<CatalogIssue> },
}

/// Flattened, ordered view of a dataset: one entry per (scope, name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    pub version: String,
    entries: Vec<SymbolEntry>,
    issues: Vec<CatalogIssue>,
}

impl Catalog {
    pub fn entries(&self) -> &[SymbolEntry] {
        &self.entries
    }

    pub fn issues(&self) -> &[CatalogIssue] {
        &self.issues
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_sound(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn get(&self, qualified_name: &str) -> Option<&SymbolEntry> {
        self.entries.iter().find(|e| e.qualified_name == qualified_name)
    }

    /// Surface every structural issue as a configuration error.
    pub fn ensure_sound(self) -> Result<Catalog, CatalogError> {
        if self.issues.is_empty() {
            Ok(self)
        } else {
            Err(CatalogError::Unsound { version: self.version, issues: self.issues })
        }
    }

    pub(crate) fn into_entries(self) -> (String, Vec<SymbolEntry>) {
        (self.version, self.entries)
    }
}

/// Builds a [`Catalog`] from a [`Dataset`].
///
/// Order is globals (by address), functions (by address), then classes by
/// raw name with their slots (by index) followed by their direct functions
/// (by address). Within a scope a later declaration replaces an earlier one
/// with the same sanitized name, keeping the earlier position. A class whose
/// sanitized name is already taken by another class is withheld.
#[derive(Debug, Clone, Default)]
pub struct CatalogBuilder {
    options: CatalogOptions,
}

impl CatalogBuilder {
    pub fn new(options: CatalogOptions) -> Self {
        Self { options }
    }

    pub fn build(&self, dataset: &Dataset) -> Catalog {
        let mut table = ScopedEntries::default();
        let mut issues = Vec::new();

        for (addr, raw) in &dataset.globals {
            let name = sanitize_global_name(raw);
            table.insert(Scope::Globals, name, raw, SymbolKind::Global, *addr, &mut issues);
        }
        for (addr, raw) in &dataset.functions {
            let name = sanitize_name(raw);
            table.insert(Scope::Functions, name, raw, SymbolKind::Function, *addr, &mut issues);
        }

        let mut resolver = InheritanceResolver::new(&dataset.classes);
        let mut class_scopes: HashMap<String, &str> = HashMap::new();
        for class in dataset.classes.values() {
            let scope_name = sanitize_name(&class.name);
            if let Some(existing) = class_scopes.get(&scope_name) {
                let issue = CatalogIssue::ScopeCollision {
                    class: class.name.clone(),
                    existing: existing.to_string(),
                    scope: scope_name,
                };
                warn!(class = %class.name, error = %issue, "rejecting class entries");
                issues.push(issue);
                continue;
            }
            class_scopes.insert(scope_name.clone(), &class.name);

            let slots = if self.options.merge_inherited {
                match resolver.resolve(&class.name) {
                    Ok(slots) => slots,
                    Err(source) => {
                        warn!(class = %class.name, error = %source, "rejecting class lineage");
                        issues.push(CatalogIssue::Lineage { class: class.name.clone(), source });
                        continue;
                    }
                }
            } else {
                class.vtable_slots.clone()
            };

            match self.slot_addresses(class, &slots) {
                Ok(addresses) => {
                    let scope = Scope::Class(scope_name);
                    for (addr, raw) in addresses {
                        let name = sanitize_name(raw);
                        let kind = SymbolKind::VtableSlot;
                        table.insert(scope.clone(), name, raw, kind, addr, &mut issues);
                    }
                    for (addr, raw) in &class.direct_functions {
                        let name = sanitize_name(raw);
                        let kind = SymbolKind::ClassMethod;
                        table.insert(scope.clone(), name, raw, kind, *addr, &mut issues);
                    }
                }
                Err(issue) => {
                    warn!(class = %class.name, error = %issue, "rejecting class entries");
                    issues.push(issue);
                }
            }
        }

        debug!(
            version = %dataset.version,
            entries = table.entries.len(),
            issues = issues.len(),
            "built symbol catalog"
        );
        Catalog { version: dataset.version.clone(), entries: table.entries, issues }
    }

    /// Recorded address of every effective slot; all-or-nothing per class.
    fn slot_addresses<'s>(
        &self,
        class: &ClassDescriptor,
        slots: &'s SlotMap,
    ) -> Result<Vec<(Address, &'s String)>, CatalogIssue> {
        let malformed = |index: i64, reason: &str| CatalogIssue::MalformedSlot {
            class: class.name.clone(),
            index,
            reason: reason.to_string(),
        };

        let Some(base) = class.vtable_base else {
            return match slots.keys().next() {
                Some(index) => Err(malformed(*index, "class declares no vtable address")),
                None => Ok(Vec::new()),
            };
        };

        slots
            .iter()
            .map(|(index, name)| -> Result<(Address, &'s String), CatalogIssue> {
                let offset = u64::try_from(*index)
                    .map_err(|_| malformed(*index, "negative slot index"))?
                    .checked_mul(self.options.pointer_size)
                    .ok_or_else(|| malformed(*index, "slot offset overflows"))?;
                let addr = base
                    .checked_add(offset)
                    .ok_or_else(|| malformed(*index, "slot address overflows"))?;
                Ok((addr, name))
            })
            .collect()
    }
}

/// Build a catalog with default options (8-byte pointers, inheritance merged).
pub fn build_catalog(dataset: &Dataset) -> Catalog {
    CatalogBuilder::default().build(dataset)
}

#[derive(Default)]
struct ScopedEntries {
    entries: Vec<SymbolEntry>,
    positions: HashMap<(Scope, String), usize>,
}

impl ScopedEntries {
    fn insert(
        &mut self,
        scope: Scope,
        name: String,
        source_name: &str,
        kind: SymbolKind,
        recorded_address: Address,
        issues: &mut Vec<CatalogIssue>,
    ) {
        if name.is_empty() {
            issues.push(CatalogIssue::UnnamedSymbol {
                scope: scope.to_string(),
                source_name: source_name.to_string(),
            });
            return;
        }

        let entry = SymbolEntry {
            qualified_name: format!("{scope}::{name}"),
            scope: scope.clone(),
            name: name.clone(),
            source_name: source_name.to_string(),
            kind,
            recorded_address,
            resolved_address: UNRESOLVED_ADDRESS,
        };

        let key = (scope, name);
        match self.positions.get(&key).copied() {
            Some(pos) => {
                debug!(
                    symbol = %entry.qualified_name,
                    replaced = %self.entries[pos].source_name,
                    by = %source_name,
                    "name collision; last declaration wins"
                );
                self.entries[pos] = entry;
            }
            None => {
                self.positions.insert(key, self.entries.len());
                self.entries.push(entry);
            }
        }
    }
}

/// Turn a raw symbol name into a stable identifier.
///
/// `::` collapses to `_`, anything outside `[A-Za-z0-9_]` is dropped, outer
/// underscores are trimmed and the first character is upper-cased.
pub fn sanitize_name(raw: &str) -> String {
    let collapsed = raw.replace("::", "_");
    let kept: String =
        collapsed.chars().filter(|c| c.is_ascii_alphanumeric() || *c == '_').collect();
    let trimmed = kept.trim_matches('_');

    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => {
            let mut out = String::with_capacity(trimmed.len());
            out.push(first.to_ascii_uppercase());
            out.push_str(chars.as_str());
            out
        }
        None => String::new(),
    }
}

/// Like [`sanitize_name`], after dropping the conventional `g_` prefix.
pub fn sanitize_global_name(raw: &str) -> String {
    sanitize_name(raw.strip_prefix("g_").unwrap_or(raw))
}
