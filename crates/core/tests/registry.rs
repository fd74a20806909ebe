use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use symbind_core::model::{Dataset, UNRESOLVED_ADDRESS};
use symbind_core::process::ProcessImage;
use symbind_core::services::gate::{GateState, VersionGate};
use symbind_core::services::registry::SymbolRegistry;
use symbind_core::store::{CacheError, CacheMetadata, DatasetCache};

const LIVE_BASE: u64 = 0x7ff6_0000_0000;

/// Cache that never holds anything but counts how often the gate asks.
#[derive(Default)]
struct CountingCache {
    loads: AtomicUsize,
}

impl DatasetCache for CountingCache {
    fn load(&self) -> Result<Option<Dataset>, CacheError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(None)
    }

    fn store(&self, _: &str, _: &Dataset, _: &str) -> Result<CacheMetadata, CacheError> {
        unreachable!("no fetcher configured")
    }
}

fn baked(version: &str) -> Dataset {
    Dataset::new(version).with_global(0x1_4050_0000, "g_foo")
}

#[test]
fn concurrent_first_use_runs_the_gate_once() {
    let cache = Arc::new(CountingCache::default());
    let gate = VersionGate::new(baked("v1")).with_cache(cache.clone());
    let registry = SymbolRegistry::new(gate, ProcessImage::new(LIVE_BASE, "v2"));
    assert!(!registry.is_initialized());

    thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| {
                let activation = registry.activation().expect("activation");
                assert_eq!(activation.state, GateState::Unresolved);
                assert_eq!(activation.address("globals::Foo"), Some(UNRESOLVED_ADDRESS));
            });
        }
    });

    assert!(registry.is_initialized());
    assert_eq!(cache.loads.load(Ordering::SeqCst), 1);
}

#[test]
fn address_initializes_lazily() {
    let registry =
        SymbolRegistry::new(VersionGate::new(baked("v1")), ProcessImage::new(LIVE_BASE, "v1"));
    assert_eq!(registry.address("globals::Foo").unwrap(), Some(0x7ff6_0050_0000));
    assert_eq!(registry.address("globals::Missing").unwrap(), None);
}

#[test]
fn swap_replaces_the_whole_table() {
    let mut registry =
        SymbolRegistry::new(VersionGate::new(baked("v1")), ProcessImage::new(LIVE_BASE, "v2"));
    assert_eq!(registry.activation().unwrap().state, GateState::Unresolved);

    let replacement = Dataset::new("v2").with_global(0x1_4060_0000, "g_bar");
    let activation = registry.swap(VersionGate::new(replacement)).expect("swap");
    assert!(activation.is_trusted());
    assert_eq!(activation.address("globals::Bar"), Some(0x7ff6_0060_0000));
    assert_eq!(activation.address("globals::Foo"), None);
}

#[test]
fn rebind_rebases_against_the_new_image() {
    let mut registry =
        SymbolRegistry::new(VersionGate::new(baked("v1")), ProcessImage::new(LIVE_BASE, "v1"));
    assert_eq!(registry.address("globals::Foo").unwrap(), Some(0x7ff6_0050_0000));

    registry.rebind(ProcessImage::new(0x7ff7_0000_0000, "v1")).expect("rebind");
    assert_eq!(registry.address("globals::Foo").unwrap(), Some(0x7ff7_0050_0000));
}

#[test]
fn failed_activation_is_retried() {
    let gate = VersionGate::new(baked("v1")).with_baseline_base(0);
    let registry = SymbolRegistry::new(gate, ProcessImage::new(LIVE_BASE, "v1"));
    assert!(registry.activation().is_err());
    assert!(!registry.is_initialized());
    assert!(registry.activation().is_err());
}
