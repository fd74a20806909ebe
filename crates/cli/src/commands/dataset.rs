use anyhow::{anyhow, bail, Result};
use serde::Serialize;
use symbind_core::emit::{emit_catalog, EmittedSymbol};
use symbind_core::services::{sanitize_name, CatalogBuilder, InheritanceResolver};
use symbind_core::store::StoreLayout;

use crate::commands::{load_config_or_default, load_dataset, print_json};
use crate::{canonicalize_or_current, format_address};

#[derive(Serialize)]
pub struct ValidationReport {
    pub version: String,
    pub sound: bool,
    pub entries: usize,
    pub classes: usize,
    pub issues: Vec<String>,
}

#[derive(Serialize)]
pub struct CatalogListing {
    pub version: String,
    pub symbols: Vec<EmittedSymbol>,
}

#[derive(Serialize)]
pub struct SlotInfo {
    pub index: i64,
    pub name: String,
    pub qualified_name: String,
    /// Recorded slot address; absent when the class has no vtable.
    pub address: Option<u64>,
}

/// Build the catalog of a description and report structural issues.
/// Fails when the catalog is unsound so scripts can gate on the exit code.
pub fn validate_command(data: &str, json: bool) -> Result<()> {
    let dataset = load_dataset(data)?;
    let catalog = CatalogBuilder::default().build(&dataset);
    let report = ValidationReport {
        version: dataset.version.clone(),
        sound: catalog.is_sound(),
        entries: catalog.len(),
        classes: dataset.classes.len(),
        issues: catalog.issues().iter().map(ToString::to_string).collect(),
    };

    if json {
        print_json(&report)?;
    } else {
        println!("Dataset {}", report.version);
        println!("  Classes: {}", report.classes);
        println!("  Entries: {}", report.entries);
        if report.issues.is_empty() {
            println!("  Issues: (none)");
        } else {
            println!("  Issues ({}):", report.issues.len());
            for issue in &report.issues {
                println!("  - {issue}");
            }
        }
    }

    if !report.sound {
        bail!(
            "Dataset '{}' is structurally unsound ({} issue(s))",
            report.version,
            report.issues.len()
        );
    }
    Ok(())
}

/// List every catalog entry with its recorded address, using the pointer
/// size and inheritance mode configured under `root`.
pub fn catalog_command(root: &str, data: &str, no_inherit: bool, json: bool) -> Result<()> {
    let layout = StoreLayout::new(canonicalize_or_current(root)?);
    let config = load_config_or_default(&layout)?;
    let dataset = load_dataset(data)?;
    let mut options = config.catalog_options();
    if no_inherit {
        options.merge_inherited = false;
    }
    let catalog = CatalogBuilder::new(options).build(&dataset);
    let symbols = emit_catalog(&catalog);

    if json {
        return print_json(&CatalogListing { version: dataset.version, symbols });
    }

    println!("Catalog for {} ({} entries):", dataset.version, symbols.len());
    if symbols.is_empty() {
        println!("  (none)");
    }
    for symbol in &symbols {
        println!(
            "  {} {} [{}] <- {}",
            format_address(symbol.address),
            symbol.name,
            symbol.kind.as_str(),
            symbol.source
        );
    }
    if !catalog.is_sound() {
        eprintln!("warning: {} issue(s) withheld entries; run `validate`", catalog.issues().len());
    }
    Ok(())
}

/// Effective (inherited + own) vtable slots of one class.
pub fn slots_command(root: &str, data: &str, class: &str, json: bool) -> Result<()> {
    let layout = StoreLayout::new(canonicalize_or_current(root)?);
    let pointer_size = load_config_or_default(&layout)?.pointer_size;
    let dataset = load_dataset(data)?;
    let descriptor = dataset
        .classes
        .get(class)
        .ok_or_else(|| anyhow!("Class '{class}' is not declared in {data}"))?;

    let mut resolver = InheritanceResolver::new(&dataset.classes);
    let slots = resolver.resolve(class)?;
    let scope = sanitize_name(class);

    let rows: Vec<SlotInfo> = slots
        .iter()
        .map(|(index, name)| SlotInfo {
            index: *index,
            name: name.clone(),
            qualified_name: format!("{scope}::{}", sanitize_name(name)),
            address: descriptor.vtable_base.and_then(|base| {
                u64::try_from(*index)
                    .ok()
                    .and_then(|i| i.checked_mul(pointer_size))
                    .and_then(|offset| base.checked_add(offset))
            }),
        })
        .collect();

    if json {
        return print_json(&rows);
    }

    let lineage = descriptor.inherits_from.as_deref().unwrap_or("(none)");
    println!("Class {class} (inherits: {lineage}), {} slot(s):", rows.len());
    if rows.is_empty() {
        println!("  (none)");
    }
    for row in rows {
        let addr = row.address.map(format_address).unwrap_or_else(|| "-".to_string());
        println!("  [{}] {} {} <- {}", row.index, addr, row.qualified_name, row.name);
    }
    Ok(())
}
