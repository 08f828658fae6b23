//! Type-safe identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::errors::{ToolboxError, Result};

/// Separator between the mount and the rest of a secret path.
pub const PATH_SEPARATOR: char = '/';

/// A validated secret location in a KV v2 store.
///
/// A full path is split at the first separator only: the first component is
/// the secrets engine mount, everything after it is the path inside that
/// mount. Both halves must be non-empty.
///
/// # Example
///
/// ```
/// use toolbox_types::SecretPath;
///
/// let path = SecretPath::parse("secret/myapp/db-password").unwrap();
/// assert_eq!(path.mount(), "secret");
/// assert_eq!(path.sub_path(), "myapp/db-password");
///
/// // Paths without a mount are rejected
/// assert!(SecretPath::parse("db-password").is_err());
/// assert!(SecretPath::parse("secret/").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SecretPath {
    mount: String,
    sub_path: String,
}

impl SecretPath {
    /// Parse a full `mount/sub/path` string.
    ///
    /// # Errors
    ///
    /// Returns [`ToolboxError::MalformedPath`] when there is no separator or
    /// either side of the first separator is empty.
    pub fn parse(full_path: impl AsRef<str>) -> Result<Self> {
        let full_path = full_path.as_ref();
        match full_path.split_once(PATH_SEPARATOR) {
            Some((mount, sub_path)) if !mount.is_empty() && !sub_path.is_empty() => Ok(Self {
                mount: mount.to_string(),
                sub_path: sub_path.to_string(),
            }),
            _ => Err(ToolboxError::MalformedPath(full_path.to_string())),
        }
    }

    /// The secrets engine mount (first path component).
    pub fn mount(&self) -> &str {
        &self.mount
    }

    /// The path inside the mount.
    pub fn sub_path(&self) -> &str {
        &self.sub_path
    }
}

impl fmt::Display for SecretPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.mount, PATH_SEPARATOR, self.sub_path)
    }
}

impl FromStr for SecretPath {
    type Err = ToolboxError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SecretPath {
    type Error = ToolboxError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<SecretPath> for String {
    fn from(path: SecretPath) -> Self {
        path.to_string()
    }
}
