//! Filesystem utilities.

use toolbox_types::{Result, ToolboxError};
use std::path::{Path, PathBuf};
use std::fs;

/// Expand a leading tilde to the current user's home directory.
pub fn expand_path(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();

    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }

    path.to_path_buf()
}

/// The conventional per-user SSH key, `~/.ssh/id_ed25519`.
pub fn default_ssh_key() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(".ssh").join("id_ed25519"))
        .ok_or_else(|| ToolboxError::Config("could not determine home directory".to_string()))
}

/// Read entire file as string (slurp).
pub fn slurp(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    fs::read_to_string(path)
        .map_err(|e| ToolboxError::Config(format!("read file {}: {}", path.display(), e)))
}
