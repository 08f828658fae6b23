//! Common utility functions.

pub mod data;
pub mod fs;

// Re-export commonly used items
pub use data::{load_json_file, load_yaml_file};
pub use fs::{default_ssh_key, expand_path, slurp};
