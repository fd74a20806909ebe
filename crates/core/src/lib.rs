//! symbind-core
//!
//! Core library for resolving symbol addresses recorded against a fixed
//! baseline image into the live process image.
//!
//! This crate defines the description model, virtual-table inheritance
//! resolution, catalog building, address rebasing and the version gate that
//! decides whether a dataset can be trusted for the running binary.
//!
//! The goal is to keep all substantive logic here so it is fully testable and
//! reusable from multiple frontends (CLI, in-process loaders, etc.).

pub mod emit;
pub mod model;
pub mod process;
pub mod services;
pub mod store;

/// Returns the library version as encoded at compile time.
///
/// Useful for tests and for frontends to report consistent version info.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
