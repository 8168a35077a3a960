//! AVD image discovery.
//!
//! Every locally configured image has a `<name>.ini` entry in the avd
//! directory; the discoverable image names are those basenames.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Default AVD directory: `$HOME/.android/avd`.
pub fn default_avd_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".android").join("avd"))
}

/// Names of the AVD images configured under `avd_dir`, sorted.
///
/// A missing directory means no images, not an error.
pub fn list_avd_images(avd_dir: &Path) -> Result<Vec<String>> {
    if !avd_dir.is_dir() {
        return Ok(Vec::new());
    }

    let entries = std::fs::read_dir(avd_dir)
        .with_context(|| format!("failed to read avd dir {}", avd_dir.display()))?;

    let mut names = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("ini") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
            names.push(stem.to_string());
        }
    }
    names.sort();
    Ok(names)
}
