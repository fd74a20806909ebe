//! Core data model for symbol descriptions and the entries derived from them.
//!
//! A [`Dataset`] is the structured, versioned description of where symbols
//! lived in the recorded image. [`SymbolEntry`] values are derived from it by
//! the catalog builder and are never edited by hand.

mod description;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use description::DescriptionError;

/// Absolute 64-bit virtual address.
pub type Address = u64;

/// Load address the reference 64-bit target assumes when addresses are recorded.
pub const REFERENCE_BASELINE_BASE: Address = 0x1_4000_0000;

/// Pointer width of the reference 64-bit target, in bytes.
pub const DEFAULT_POINTER_SIZE: u64 = 8;

/// Sentinel stored in `resolved_address` when no trustworthy live address exists.
pub const UNRESOLVED_ADDRESS: Address = 0;

/// Versioned description of symbol addresses for one build of the target binary.
///
/// All maps are ordered so that every traversal (and therefore the catalog)
/// is deterministic for a given dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "description::DatasetDocument", into = "description::DatasetDocument")]
pub struct Dataset {
    /// Build/version string of the binary the addresses were recorded against.
    pub version: String,
    pub globals: BTreeMap<Address, String>,
    pub functions: BTreeMap<Address, String>,
    /// Classes keyed by their raw (unsanitized) name.
    pub classes: BTreeMap<String, ClassDescriptor>,
}

impl Dataset {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            globals: BTreeMap::new(),
            functions: BTreeMap::new(),
            classes: BTreeMap::new(),
        }
    }

    /// Builder-style helper to record a global variable.
    pub fn with_global(mut self, address: Address, name: impl Into<String>) -> Self {
        self.globals.insert(address, name.into());
        self
    }

    /// Builder-style helper to record a free function.
    pub fn with_function(mut self, address: Address, name: impl Into<String>) -> Self {
        self.functions.insert(address, name.into());
        self
    }

    /// Builder-style helper to record a class. A class with the same name is replaced.
    pub fn with_class(mut self, class: ClassDescriptor) -> Self {
        self.classes.insert(class.name.clone(), class);
        self
    }

    /// Total number of raw symbol declarations (before inheritance is applied).
    pub fn declared_symbols(&self) -> usize {
        self.globals.len()
            + self.functions.len()
            + self
                .classes
                .values()
                .map(|c| c.vtable_slots.len() + c.direct_functions.len())
                .sum::<usize>()
    }
}

/// Description of one class: its parent, virtual table and direct functions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClassDescriptor {
    /// Raw class name; filled from the enclosing `classes` map key.
    #[serde(skip)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherits_from: Option<String>,
    /// Recorded address of the virtual table. `0` in a description means "none".
    #[serde(
        default,
        rename = "vtbl",
        deserialize_with = "description::zero_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub vtable_base: Option<Address>,
    /// Explicit slot index → method name. Signed so that malformed (negative)
    /// indices survive parsing and are reported by the catalog builder.
    #[serde(
        default,
        rename = "vfuncs",
        deserialize_with = "description::null_as_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub vtable_slots: BTreeMap<i64, String>,
    #[serde(
        default,
        rename = "funcs",
        deserialize_with = "description::null_as_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub direct_functions: BTreeMap<Address, String>,
}

impl ClassDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    pub fn inherits(mut self, parent: impl Into<String>) -> Self {
        self.inherits_from = Some(parent.into());
        self
    }

    pub fn vtable(mut self, base: Address) -> Self {
        self.vtable_base = Some(base);
        self
    }

    pub fn slot(mut self, index: i64, name: impl Into<String>) -> Self {
        self.vtable_slots.insert(index, name.into());
        self
    }

    pub fn function(mut self, address: Address, name: impl Into<String>) -> Self {
        self.direct_functions.insert(address, name.into());
        self
    }
}

/// Classification of a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Global,
    Function,
    ClassMethod,
    VtableSlot,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Global => "global",
            SymbolKind::Function => "function",
            SymbolKind::ClassMethod => "class_method",
            SymbolKind::VtableSlot => "vtable_slot",
        }
    }
}

/// Symbol-table scope in which entry names must be unique.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Globals,
    Functions,
    /// Combined slot + function space of one class, keyed by its sanitized name.
    Class(String),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Globals => f.write_str("globals"),
            Scope::Functions => f.write_str("functions"),
            Scope::Class(name) => f.write_str(name),
        }
    }
}

/// One resolved symbol: a sanitized, scoped name plus its recorded and live address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolEntry {
    pub scope: Scope,
    /// Sanitized identifier, unique within `scope`.
    pub name: String,
    /// `<scope>::<name>`, unique across the whole catalog.
    pub qualified_name: String,
    /// Name exactly as written in the description.
    pub source_name: String,
    pub kind: SymbolKind,
    pub recorded_address: Address,
    /// Live address; the unresolved sentinel until the table is activated.
    pub resolved_address: Address,
}
