use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

pub mod commands;
pub mod logging;

/// Canonicalize the root path if possible, falling back to the given string
/// relative to the current working directory.
pub fn canonicalize_or_current(root: &str) -> Result<PathBuf> {
    let path = Path::new(root);
    if path == Path::new(".") {
        Ok(env::current_dir().context("Failed to get current directory")?)
    } else {
        // The path may not exist yet (e.g. before `init`).
        match path.canonicalize() {
            Ok(p) => Ok(p),
            Err(_) => {
                let cwd = env::current_dir().context("Failed to get current directory")?;
                Ok(cwd.join(path))
            }
        }
    }
}

/// Parse an address given as `0x`-prefixed hex or plain decimal.
/// Underscores are accepted as digit separators.
pub fn parse_address(raw: &str) -> Result<u64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != '_').collect();
    let parsed = match cleaned.strip_prefix("0x").or_else(|| cleaned.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => cleaned.parse::<u64>(),
    };
    parsed.map_err(|e| anyhow!("Invalid address '{raw}': {e}"))
}

/// Format an address the way descriptions write them.
pub fn format_address(addr: u64) -> String {
    format!("{addr:#x}")
}
