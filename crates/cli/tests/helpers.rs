use std::fs;

use symbind::{canonicalize_or_current, format_address, parse_address};
use tempfile::tempdir;

#[test]
fn canonicalize_or_current_handles_dot_and_relative_paths() {
    let original = std::env::current_dir().expect("cwd");
    let tmp = tempdir().expect("tempdir");
    let subdir = tmp.path().join("nested");
    fs::create_dir_all(&subdir).expect("create nested");
    std::env::set_current_dir(tmp.path()).expect("chdir tmp");

    let dot = canonicalize_or_current(".").expect("canonicalize").canonicalize().expect("canon");
    assert_eq!(dot, tmp.path().canonicalize().expect("canon tmp"));

    let nested = canonicalize_or_current("nested").expect("canonicalize nested");
    assert_eq!(nested, subdir.canonicalize().expect("canonicalize subdir"));

    let missing = canonicalize_or_current("not-yet").expect("missing path");
    assert!(missing.ends_with("not-yet"));
    assert!(missing.is_absolute());

    std::env::set_current_dir(original).expect("restore cwd");
}

#[test]
fn parse_address_accepts_hex_and_decimal() {
    assert_eq!(parse_address("0x140000000").unwrap(), 0x1_4000_0000);
    assert_eq!(parse_address("0X7FF6_0000_0000").unwrap(), 0x7ff6_0000_0000);
    assert_eq!(parse_address("5368709120").unwrap(), 0x1_4000_0000);
    assert_eq!(parse_address(" 16 ").unwrap(), 16);
}

#[test]
fn parse_address_rejects_garbage() {
    let err = parse_address("0xZZ").unwrap_err();
    assert!(err.to_string().contains("Invalid address '0xZZ'"));
    assert!(parse_address("-1").is_err());
    assert!(parse_address("").is_err());
}

#[test]
fn format_address_uses_prefixed_hex() {
    assert_eq!(format_address(0x7ff6_0050_0000), "0x7ff600500000");
}
