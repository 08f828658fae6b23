//! YAML and JSON data handling utilities.

use toolbox_types::{Result, ToolboxError};
use serde::de::DeserializeOwned;
use std::path::Path;

use super::fs::slurp;

/// Load and deserialize a YAML file.
pub fn load_yaml_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let content = slurp(path)?;
    serde_yaml::from_str(&content)
        .map_err(|e| ToolboxError::Config(format!("parse YAML {}: {}", path.display(), e)))
}

/// Load and deserialize a JSON file.
pub fn load_json_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let content = slurp(path)?;
    serde_json::from_str(&content)
        .map_err(|e| ToolboxError::Config(format!("parse JSON {}: {}", path.display(), e)))
}
