//! Host directory: symbolic node names to network addresses.
//!
//! The directory file is a JSON object keyed by host name:
//!
//! ```json
//! {
//!   "kube-1": { "address": "2001:db8::11" },
//!   "kube-2": { "ipv6_address": "2001:db8::12" }
//! }
//! ```

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use toolbox_types::{HostRecord, Result, ToolboxError};
use tracing::debug;

use crate::util::load_json_file;

#[derive(Debug, Deserialize)]
struct HostEntry {
    #[serde(default, alias = "ipv6_address")]
    address: String,
}

/// Name → address lookup loaded once per process.
#[derive(Debug, Clone, Default)]
pub struct HostDirectory {
    hosts: BTreeMap<String, HostRecord>,
}

impl HostDirectory {
    /// Build a directory from already-parsed records.
    pub fn from_records(records: impl IntoIterator<Item = HostRecord>) -> Self {
        let hosts = records
            .into_iter()
            .map(|record| (record.name.clone(), record))
            .collect();
        Self { hosts }
    }

    /// Load the directory from a JSON file.
    ///
    /// A missing file or a structure that is not a map of host objects is a
    /// [`ToolboxError::Config`] error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let entries: BTreeMap<String, HostEntry> = load_json_file(path)?;
        let directory = Self::from_records(entries.into_iter().map(|(name, entry)| HostRecord {
            name,
            address: entry.address,
        }));
        debug!(path = %path.display(), hosts = directory.len(), "host directory loaded");
        Ok(directory)
    }

    /// Resolve a host name to its address.
    ///
    /// Lookup is exact and case-sensitive.
    pub fn resolve(&self, name: &str) -> Result<&str> {
        let record = self.hosts.get(name).ok_or_else(|| ToolboxError::HostNotFound {
            name: name.to_string(),
            known: self.names(),
        })?;

        if record.address.is_empty() {
            return Err(ToolboxError::HostAddressMissing {
                name: name.to_string(),
            });
        }

        Ok(&record.address)
    }

    /// All known host names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.hosts.keys().cloned().collect()
    }

    /// Number of hosts in the directory.
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    /// Whether the directory is empty.
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn record(name: &str, address: &str) -> HostRecord {
        HostRecord {
            name: name.to_string(),
            address: address.to_string(),
        }
    }

    #[test]
    fn test_resolve_exact_match() {
        let dir = HostDirectory::from_records([
            record("kube-1", "2001:db8::11"),
            record("kube-2", "10.0.0.12"),
        ]);
        assert_eq!(dir.resolve("kube-1").unwrap(), "2001:db8::11");
        assert_eq!(dir.resolve("kube-2").unwrap(), "10.0.0.12");
    }

    #[test]
    fn test_resolve_is_case_sensitive_and_lists_names() {
        let dir = HostDirectory::from_records([
            record("kube-2", "10.0.0.12"),
            record("kube-1", "10.0.0.11"),
        ]);
        match dir.resolve("KUBE-1") {
            Err(ToolboxError::HostNotFound { name, known }) => {
                assert_eq!(name, "KUBE-1");
                assert_eq!(known, vec!["kube-1", "kube-2"]);
            }
            other => panic!("expected HostNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_address_is_distinct_error() {
        let dir = HostDirectory::from_records([record("kube-3", "")]);
        assert!(matches!(
            dir.resolve("kube-3"),
            Err(ToolboxError::HostAddressMissing { .. })
        ));
    }

    #[test]
    fn test_load_accepts_both_field_names() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"kube-1": {{"ipv6_address": "2001:db8::11"}}, "kube-2": {{"address": "10.0.0.12"}}, "kube-3": {{}}}}"#
        )
        .unwrap();

        let dir = HostDirectory::load(file.path()).unwrap();
        assert_eq!(dir.len(), 3);
        assert_eq!(dir.resolve("kube-1").unwrap(), "2001:db8::11");
        assert_eq!(dir.resolve("kube-2").unwrap(), "10.0.0.12");
        assert!(matches!(
            dir.resolve("kube-3"),
            Err(ToolboxError::HostAddressMissing { .. })
        ));
    }

    #[test]
    fn test_load_rejects_malformed_structure() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"["kube-1", "kube-2"]"#).unwrap();
        assert!(matches!(
            HostDirectory::load(file.path()),
            Err(ToolboxError::Config(_))
        ));

        assert!(matches!(
            HostDirectory::load("/no/such/hosts.json"),
            Err(ToolboxError::Config(_))
        ));
    }
}
