use symbind_core::model::{Dataset, REFERENCE_BASELINE_BASE, UNRESOLVED_ADDRESS};
use symbind_core::version;

#[test]
fn version_is_non_empty() {
    let v = version();
    assert!(!v.is_empty());
}

#[test]
fn reference_constants_match_target() {
    assert_eq!(REFERENCE_BASELINE_BASE, 0x1_4000_0000);
    assert_eq!(UNRESOLVED_ADDRESS, 0);
}

#[test]
fn declared_symbols_counts_raw_declarations() {
    let dataset = Dataset::new("v1")
        .with_global(0x1_4050_0000, "g_foo")
        .with_function(0x1_4010_0000, "Create")
        .with_class(
            symbind_core::model::ClassDescriptor::new("Foo")
                .vtable(0x1_4100_0100)
                .slot(0, "Ctor")
                .function(0x1_4020_0000, "Update"),
        );
    assert_eq!(dataset.declared_symbols(), 4);
}
