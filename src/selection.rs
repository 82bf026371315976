//! Persists the operator's route selection between runs.
//!
//! The selection is a JSON array of route short names. A missing or corrupt
//! file never stops the tracker: it falls back to the configured defaults.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, error};

/// Loads the saved selection, or `defaults` when there is none.
pub fn load_selection(path: &Path, defaults: &[String]) -> Vec<String> {
    if !path.exists() {
        debug!(path = %path.display(), "No saved selection, using defaults");
        return defaults.to_vec();
    }

    let loaded = std::fs::read_to_string(path)
        .map_err(anyhow::Error::from)
        .and_then(|content| {
            serde_json::from_str::<Vec<String>>(&content).map_err(anyhow::Error::from)
        });

    match loaded {
        Ok(routes) => routes,
        Err(e) => {
            error!(path = %path.display(), error = %e, "Failed to load saved selection");
            defaults.to_vec()
        }
    }
}

pub fn save_selection(path: &Path, routes: &[String]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string(routes)?;
    std::fs::write(path, content)
        .with_context(|| format!("{}: cannot save selection", path.display()))
}

/// Removes the saved selection. Clearing an absent selection is not an error.
pub fn clear_selection(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("{}: cannot clear selection", path.display())),
    }
}
