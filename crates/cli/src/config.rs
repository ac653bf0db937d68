//! Polyform.yml discovery and loading.

use std::path::{Path, PathBuf};

use polyform_core::Polyform;

pub(crate) const DEFAULT_CONFIG: &str = "Polyform.yml";

/// Resolve `--config`, falling back to `Polyform.yml` in the current directory.
pub(crate) fn config_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG))
}

/// Read a YAML configuration into a JSON document.
pub(crate) fn load_config(path: &Path) -> Result<serde_json::Value, String> {
    tracing::debug!(path = %path.display(), "loading config");
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("error reading config '{}': {}", path.display(), e))?;
    serde_yaml::from_str(&text).map_err(|e| format!("error parsing YAML in '{}': {}", path.display(), e))
}

/// Load and assemble the configuration at `path`.
pub(crate) fn load_polyform(path: &Path) -> Result<Polyform, String> {
    let doc = load_config(path)?;
    Polyform::from_value(&doc).map_err(|e| format!("invalid config '{}': {}", path.display(), e))
}
