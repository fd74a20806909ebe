use std::fs;

use symbind_core::model::{Dataset, REFERENCE_BASELINE_BASE};
use symbind_core::process::{
    beside_current_exe, read_version_file, ProcessError, ProcessImage, DEFAULT_VERSION_FILE,
};
use symbind_core::store::{
    fetcher_from_config, fingerprint, gate_from_config, load_resolver_config,
    save_resolver_config, DatasetCache, FetchCommandConfig, FileCache, ResolverConfig,
    StoreLayout,
};
use tempfile::tempdir;

#[test]
fn layout_paths_live_under_meta_dir() {
    let layout = StoreLayout::new("/opt/game");
    assert_eq!(layout.meta_dir, layout.root.join(".symbind"));
    assert_eq!(layout.config_path, layout.meta_dir.join("config.json"));
    assert_eq!(layout.cached_description_path, layout.cache_dir.join("dataset.yml"));
    assert_eq!(layout.cached_metadata_path, layout.cache_dir.join("dataset.meta.json"));
    assert_eq!(layout.resolve_relative("mirror"), layout.root.join("mirror"));
    assert_eq!(layout.resolve_relative("/srv/mirror"), std::path::PathBuf::from("/srv/mirror"));
}

#[test]
fn config_round_trips_through_disk() {
    let root = tempdir().unwrap();
    let layout = StoreLayout::new(root.path());
    let config = ResolverConfig::new()
        .with_baseline_base(0x40_0000)
        .with_mirror_dir(Some("mirror".into()));

    save_resolver_config(&layout, &config).expect("save");
    assert!(layout.config_path.is_file());
    assert_eq!(load_resolver_config(&layout).expect("load"), config);
}

#[test]
fn missing_or_invalid_config_reports_context() {
    let root = tempdir().unwrap();
    let layout = StoreLayout::new(root.path());

    let err = load_resolver_config(&layout).unwrap_err();
    assert!(err.to_string().contains("Failed to read resolver config"));

    fs::create_dir_all(&layout.meta_dir).unwrap();
    fs::write(&layout.config_path, "{ not json").unwrap();
    let err = load_resolver_config(&layout).unwrap_err();
    assert!(err.to_string().contains("Failed to parse resolver config JSON"));

    fs::write(&layout.config_path, r#"{"config_version":"0.1.0","baseline_base":0}"#).unwrap();
    let err = load_resolver_config(&layout).unwrap_err();
    assert!(format!("{err:#}").contains("baseline_base must be non-zero"));

    let bad = ResolverConfig::new().with_baseline_base(0);
    assert!(save_resolver_config(&layout, &bad).is_err());
}

#[test]
fn file_cache_round_trip_records_fingerprint() {
    let root = tempdir().unwrap();
    let layout = StoreLayout::new(root.path());
    let cache = FileCache::new(&layout);
    assert!(cache.load().unwrap().is_none());
    assert!(cache.metadata().unwrap().is_none());

    let text = "version: v9\nglobals:\n  0x140500000: g_foo\n";
    let dataset = Dataset::from_yaml_str(text).unwrap();
    let metadata = cache.store(text, &dataset, "mirror").expect("store");

    assert_eq!(metadata.version, "v9");
    assert_eq!(metadata.sha256, fingerprint(text));
    assert_eq!(metadata.sha256.len(), 64);
    assert!(chrono::DateTime::parse_from_rfc3339(&metadata.fetched_at).is_ok());
    assert_eq!(fs::read_to_string(cache.description_path()).unwrap(), text);
    assert_eq!(cache.load().unwrap(), Some(dataset));
    assert_eq!(cache.metadata().unwrap(), Some(metadata));
}

#[test]
fn corrupt_cache_is_an_error() {
    let root = tempdir().unwrap();
    let layout = StoreLayout::new(root.path());
    fs::create_dir_all(&layout.cache_dir).unwrap();
    fs::write(&layout.cached_description_path, "globals: {}\n").unwrap();
    let err = FileCache::new(&layout).load().unwrap_err();
    assert!(err.to_string().contains("Cached description is unreadable"));
}

#[test]
fn fetch_command_takes_precedence_over_mirror() {
    let layout = StoreLayout::new("/opt/game");
    assert!(fetcher_from_config(&layout, &ResolverConfig::new()).is_none());

    let mirror = ResolverConfig::new().with_mirror_dir(Some("mirror".into()));
    assert_eq!(fetcher_from_config(&layout, &mirror).unwrap().name(), "mirror");

    let mut both = mirror.clone();
    both.fetch_command = Some(FetchCommandConfig {
        program: "curl".into(),
        args: vec!["-sf".into(), "https://example.invalid/{version}.yml".into()],
    });
    assert_eq!(fetcher_from_config(&layout, &both).unwrap().name(), "command");
}

#[test]
fn gate_from_config_uses_the_file_cache() {
    let root = tempdir().unwrap();
    let layout = StoreLayout::new(root.path());
    let cache = FileCache::new(&layout);
    let text = "version: v2\nglobals:\n  0x140600000: g_bar\n";
    cache.store(text, &Dataset::from_yaml_str(text).unwrap(), "test").unwrap();

    let baked = Dataset::new("v1").with_global(0x1_4050_0000, "g_foo");
    let gate = gate_from_config(&layout, &ResolverConfig::new(), baked.clone());
    let activation = gate.run(&ProcessImage::new(0x7ff6_0000_0000, "v2")).unwrap();
    assert!(activation.is_trusted());
    assert_eq!(activation.address("globals::Bar"), Some(0x7ff6_0060_0000));

    let mut legacy = ResolverConfig::new();
    legacy.merge_inherited = false;
    let activation = gate_from_config(&layout, &legacy, baked)
        .run(&ProcessImage::new(0x7ff6_0000_0000, "v2"))
        .unwrap();
    assert!(activation.legacy);
    assert_eq!(activation.table.version(), "v1");
}

#[test]
fn version_file_is_trimmed() {
    let root = tempdir().unwrap();
    let path = root.path().join("ffxivgame.ver");
    fs::write(&path, "2021.11.16.0000.0000\r\n").unwrap();
    assert_eq!(read_version_file(&path).unwrap(), "2021.11.16.0000.0000");

    let image = ProcessImage::from_version_file(REFERENCE_BASELINE_BASE, &path).unwrap();
    assert_eq!(image.version, "2021.11.16.0000.0000");

    fs::write(&path, "  \n").unwrap();
    assert!(matches!(read_version_file(&path), Err(ProcessError::EmptyVersion(_))));
    assert!(matches!(
        read_version_file(&root.path().join("missing.ver")),
        Err(ProcessError::VersionFile { .. })
    ));
}

#[test]
fn default_version_file_sits_beside_the_executable() {
    let path = beside_current_exe(DEFAULT_VERSION_FILE).expect("current exe");
    let exe = std::env::current_exe().expect("current exe");
    assert_eq!(path.parent(), exe.parent());
    assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("ffxivgame.ver"));
}
