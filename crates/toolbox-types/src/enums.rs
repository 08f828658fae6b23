//! Common enumerations used throughout the toolbox.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::errors::{ToolboxError, Result};

/// Kind of secret material a specification entry asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretKind {
    /// Random alphanumeric string
    Random,
    /// SSH keypair
    Ssh,
    /// Value typed in by the operator
    Manual,
}

impl SecretKind {
    /// Whether producing this kind needs an operator at the keyboard.
    pub fn is_interactive(&self) -> bool {
        matches!(self, SecretKind::Manual)
    }
}

impl FromStr for SecretKind {
    type Err = ToolboxError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "random" => Ok(SecretKind::Random),
            "ssh" => Ok(SecretKind::Ssh),
            "manual" => Ok(SecretKind::Manual),
            _ => Err(ToolboxError::Unsupported {
                what: "secret type",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for SecretKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretKind::Random => write!(f, "random"),
            SecretKind::Ssh => write!(f, "ssh"),
            SecretKind::Manual => write!(f, "manual"),
        }
    }
}

/// Keypair algorithm for `ssh` secrets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyAlgorithm {
    /// Ed25519 (PKCS#8 private key)
    #[default]
    Ed25519,
    /// RSA 4096 (PKCS#1 private key)
    Rsa,
}

impl FromStr for KeyAlgorithm {
    type Err = ToolboxError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ed25519" => Ok(KeyAlgorithm::Ed25519),
            "rsa" => Ok(KeyAlgorithm::Rsa),
            _ => Err(ToolboxError::Unsupported {
                what: "algorithm",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyAlgorithm::Ed25519 => write!(f, "ed25519"),
            KeyAlgorithm::Rsa => write!(f, "rsa"),
        }
    }
}

/// When interactive (`manual`) entries are processed relative to the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PromptOrder {
    /// Process every entry exactly in specification order
    #[default]
    InOrder,
    /// Process all automatic entries first, then the manual ones
    ///
    /// Each group keeps its specification order.
    DeferManual,
}

/// How a remote process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitInfo {
    /// Exited with a status code
    Status(u32),
    /// Killed by a signal
    Signal(String),
    /// Channel closed without reporting a status
    Unknown,
}

impl ExitInfo {
    /// Whether this represents a clean exit.
    pub fn success(&self) -> bool {
        matches!(self, ExitInfo::Status(0))
    }
}

impl fmt::Display for ExitInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitInfo::Status(code) => write!(f, "exit status {}", code),
            ExitInfo::Signal(sig) => write!(f, "killed by signal {}", sig),
            ExitInfo::Unknown => write!(f, "no exit status"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_kind_parsing() {
        assert_eq!("random".parse::<SecretKind>().unwrap(), SecretKind::Random);
        assert_eq!("ssh".parse::<SecretKind>().unwrap(), SecretKind::Ssh);
        assert_eq!("manual".parse::<SecretKind>().unwrap(), SecretKind::Manual);
    }

    #[test]
    fn test_unknown_kind_is_unsupported() {
        match "quantum".parse::<SecretKind>() {
            Err(ToolboxError::Unsupported { what, value }) => {
                assert_eq!(what, "secret type");
                assert_eq!(value, "quantum");
            }
            other => panic!("expected Unsupported, got {:?}", other),
        }
        // lookups are case-sensitive
        assert!("Random".parse::<SecretKind>().is_err());
    }

    #[test]
    fn test_algorithm_parsing() {
        assert_eq!(KeyAlgorithm::default(), KeyAlgorithm::Ed25519);
        assert_eq!("rsa".parse::<KeyAlgorithm>().unwrap(), KeyAlgorithm::Rsa);
        let err = "dsa".parse::<KeyAlgorithm>().unwrap_err();
        assert_eq!(err.to_string(), "unsupported algorithm: dsa");
    }

    #[test]
    fn test_exit_info() {
        assert!(ExitInfo::Status(0).success());
        assert!(!ExitInfo::Status(2).success());
        assert!(!ExitInfo::Unknown.success());
        assert_eq!(ExitInfo::Signal("TERM".into()).to_string(), "killed by signal TERM");
    }
}
