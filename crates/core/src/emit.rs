//! Output catalog contract for downstream emitters.
//!
//! Whatever consumes the table (a code generator, a runtime registry) gets
//! exactly one [`EmittedSymbol`] per catalog entry, carrying the name it was
//! declared under in the description.

use serde::{Deserialize, Serialize};

use crate::model::{Address, SymbolEntry, SymbolKind};
use crate::services::{Catalog, SymbolTable};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmittedSymbol {
    /// Qualified, sanitized identifier.
    pub name: String,
    /// Name as written in the description.
    pub source: String,
    pub kind: SymbolKind,
    pub address: Address,
}

impl EmittedSymbol {
    fn new(entry: &SymbolEntry, address: Address) -> Self {
        Self {
            name: entry.qualified_name.clone(),
            source: entry.source_name.clone(),
            kind: entry.kind,
            address,
        }
    }
}

/// Live addresses of an activated table.
pub fn emit_table(table: &SymbolTable) -> Vec<EmittedSymbol> {
    table.entries().iter().map(|e| EmittedSymbol::new(e, e.resolved_address)).collect()
}

/// Recorded addresses of a catalog that has not been activated.
pub fn emit_catalog(catalog: &Catalog) -> Vec<EmittedSymbol> {
    catalog.entries().iter().map(|e| EmittedSymbol::new(e, e.recorded_address)).collect()
}
