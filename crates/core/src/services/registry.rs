use once_cell::sync::OnceCell;
use tracing::info;

use crate::model::Address;
use crate::process::ProcessImage;
use crate::services::gate::{Activation, GateError, VersionGate};

/// Owner of the live symbol table.
///
/// The first call to [`SymbolRegistry::activation`] runs the gate; concurrent
/// first callers block on the same initialization and all observe its
/// result. A failed pass is not cached, so the next caller retries. Swapping
/// the dataset requires `&mut self` and always performs a full new pass.
pub struct SymbolRegistry {
    gate: VersionGate,
    image: ProcessImage,
    active: OnceCell<Activation>,
}

impl SymbolRegistry {
    pub fn new(gate: VersionGate, image: ProcessImage) -> Self {
        Self { gate, image, active: OnceCell::new() }
    }

    pub fn activation(&self) -> Result<&Activation, GateError> {
        self.active.get_or_try_init(|| self.gate.run(&self.image))
    }

    pub fn is_initialized(&self) -> bool {
        self.active.get().is_some()
    }

    /// Live address of `qualified_name`, initializing on first use.
    pub fn address(&self, qualified_name: &str) -> Result<Option<Address>, GateError> {
        Ok(self.activation()?.address(qualified_name))
    }

    /// Replace the gate (and its baked dataset) and activate it from scratch.
    pub fn swap(&mut self, gate: VersionGate) -> Result<&Activation, GateError> {
        info!(baked = %gate.baked().version, "swapping dataset");
        self.gate = gate;
        self.active = OnceCell::new();
        self.activation()
    }

    /// Re-run the gate against a new live image (e.g. after the host reloads).
    pub fn rebind(&mut self, image: ProcessImage) -> Result<&Activation, GateError> {
        self.image = image;
        self.active = OnceCell::new();
        self.activation()
    }
}
