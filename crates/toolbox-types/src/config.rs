//! Configuration types and structures.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Default SSH port.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Default SSH user.
pub const DEFAULT_SSH_USER: &str = "root";

/// Default bound on dial + handshake + authentication.
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(10);

/// The key-value map stored at one secret location.
pub type SecretRecord = HashMap<String, String>;

/// One entry from the host directory file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRecord {
    /// Symbolic host name (e.g. `kube-1`)
    pub name: String,
    /// IPv6 or IPv4 literal
    pub address: String,
}

/// How to reach and authenticate against the SSH jump node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshEndpoint {
    /// Host address (IP literal or resolvable name)
    pub host: String,
    /// TCP port
    pub port: u16,
    /// Login user
    pub user: String,
    /// Private key used for public-key authentication
    pub private_key_path: PathBuf,
    /// Bound on dial + handshake + authentication
    pub dial_timeout: Duration,
}

impl SshEndpoint {
    /// Create an endpoint with the default port, user and timeout.
    pub fn new(host: impl Into<String>, private_key_path: impl Into<PathBuf>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_SSH_PORT,
            user: DEFAULT_SSH_USER.to_string(),
            private_key_path: private_key_path.into(),
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
        }
    }

    /// `host:port`, with IPv6 literals bracketed.
    pub fn dial_address(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// What the remote forwarding helper exposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardTarget {
    /// Kubernetes namespace of the service
    pub namespace: String,
    /// Service reference passed to the helper (e.g. `svc/vault`)
    pub service_name: String,
    /// Port bound on the remote host's loopback
    pub remote_port: u16,
}

impl Default for ForwardTarget {
    fn default() -> Self {
        Self {
            namespace: "vault".to_string(),
            service_name: "svc/vault".to_string(),
            remote_port: 8200,
        }
    }
}

impl ForwardTarget {
    /// The long-lived remote command that exposes the service.
    ///
    /// `exec` replaces the remote shell so a TERM sent to the session
    /// reaches the helper itself.
    pub fn helper_command(&self) -> String {
        format!(
            "exec kubectl port-forward {} -n {} {}:{}",
            self.service_name, self.namespace, self.remote_port, self.remote_port
        )
    }
}

/// Where the bootstrap credential lives on the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSource {
    /// Namespace of the secret object
    pub namespace: String,
    /// Name of the secret object
    pub secret_name: String,
    /// Data key holding the base64-encoded token
    pub key: String,
}

impl Default for TokenSource {
    fn default() -> Self {
        Self {
            namespace: "vault".to_string(),
            secret_name: "vault-unseal-keys".to_string(),
            key: "vault-root".to_string(),
        }
    }
}

impl TokenSource {
    /// The one-shot remote command printing the encoded token.
    pub fn fetch_command(&self) -> String {
        format!(
            "kubectl get secret {} -n {} -o template='{{{{ index .data \"{}\" }}}}'",
            self.secret_name, self.namespace, self.key
        )
    }
}

/// One entry of the secret specification file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretSpec {
    /// Full `mount/sub/path` location
    pub path: String,
    /// Secret kind (`random`, `ssh`, `manual`); validated when processed
    #[serde(rename = "type")]
    pub kind: String,
    /// Length of `random` secrets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
    /// Keypair algorithm of `ssh` secrets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
    /// Prompt shown for `manual` secrets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SecretSpec {
    /// Spec with just a path and a kind.
    pub fn new(path: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: kind.into(),
            length: None,
            algorithm: None,
            description: None,
        }
    }
}

/// Root of the secret specification file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretSpecFile {
    /// Ordered secret entries
    #[serde(default)]
    pub secrets: Vec<SecretSpec>,
}
