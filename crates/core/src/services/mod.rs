//! Resolution pipeline: inheritance → catalog → (gate) → rebase.

pub mod catalog;
pub mod fetch;
pub mod gate;
pub mod inheritance;
pub mod rebase;
pub mod registry;

pub use catalog::{
    build_catalog, sanitize_global_name, sanitize_name, Catalog, CatalogBuilder, CatalogError,
    CatalogIssue, CatalogOptions,
};
pub use fetch::{fetch_with_timeout, CommandFetcher, DatasetFetcher, FetchError, MirrorFetcher};
pub use gate::{Activation, GateError, GateState, VersionGate};
pub use inheritance::{InheritanceResolver, ResolveError, SlotMap};
pub use rebase::{translate, AddressMode, RebaseError, Rebaser, SymbolTable, UNRESOLVED_ADDRESS};
pub use registry::SymbolRegistry;
