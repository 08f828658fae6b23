//! Run configuration for the toolbox.
//!
//! Every operator-supplied parameter of one invocation lives in a single
//! [`RunConfig`] value which the entry point receives explicitly. The CLI
//! fills it from flags (with `TOOLBOX_*` environment fallbacks); library
//! callers construct it directly.
//!
//! ## Example
//!
//! ```no_run
//! use toolbox_core::config::RunConfig;
//!
//! let config = RunConfig::new("hosts.json", "kube-1", "secrets.yaml");
//! config.validate()?;
//! let specs = toolbox_core::config::load_spec_file(&config.spec_file)?;
//! # Ok::<(), toolbox_types::ToolboxError>(())
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;
use toolbox_types::config::{SecretSpecFile, DEFAULT_DIAL_TIMEOUT, DEFAULT_SSH_PORT, DEFAULT_SSH_USER};
use toolbox_types::{bail, ForwardTarget, PromptOrder, Result, SecretSpec, SshEndpoint, TokenSource};

use crate::util::{default_ssh_key, expand_path, load_yaml_file};

/// Default bound on waiting for the secret store to report healthy.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(30);

/// How the SSH server's host key is checked.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HostKeyCheck {
    /// Accept whatever key the server presents.
    ///
    /// INSECURE: a machine-in-the-middle can impersonate the node and
    /// capture the bootstrap credential. This is the default only because
    /// the nodes are freshly provisioned and have no recorded keys yet.
    #[default]
    AcceptAny,
    /// Require the server key to match this `SHA256:<base64>` fingerprint.
    Fingerprint(String),
}

/// All parameters of one provisioning run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Host directory JSON file
    pub hosts_file: PathBuf,
    /// Symbolic name of the node to tunnel through
    pub host: String,
    /// Secret specification YAML file
    pub spec_file: PathBuf,
    /// SSH login user
    pub ssh_user: String,
    /// SSH private key path; `~/.ssh/id_ed25519` when unset
    pub ssh_key: Option<PathBuf>,
    /// SSH port
    pub ssh_port: u16,
    /// Bound on the SSH dial
    pub dial_timeout: Duration,
    /// Bound on waiting for the store to become healthy
    pub ready_timeout: Duration,
    /// Host key verification policy
    pub host_key: HostKeyCheck,
    /// Ordering of interactive entries
    pub prompt_order: PromptOrder,
    /// Service exposed through the tunnel
    pub forward: ForwardTarget,
    /// Where the bootstrap credential is read from
    pub token: TokenSource,
}

impl RunConfig {
    /// Create a configuration with defaults for everything optional.
    pub fn new(
        hosts_file: impl Into<PathBuf>,
        host: impl Into<String>,
        spec_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            hosts_file: hosts_file.into(),
            host: host.into(),
            spec_file: spec_file.into(),
            ssh_user: DEFAULT_SSH_USER.to_string(),
            ssh_key: None,
            ssh_port: DEFAULT_SSH_PORT,
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
            ready_timeout: DEFAULT_READY_TIMEOUT,
            host_key: HostKeyCheck::default(),
            prompt_order: PromptOrder::default(),
            forward: ForwardTarget::default(),
            token: TokenSource::default(),
        }
    }

    /// Check required values before any file or network access.
    pub fn validate(&self) -> Result<()> {
        if self.hosts_file.as_os_str().is_empty() {
            bail!(Config, "hosts file must be provided");
        }
        if self.host.is_empty() {
            bail!(Config, "host must be provided");
        }
        if self.spec_file.as_os_str().is_empty() {
            bail!(Config, "spec file must be provided");
        }
        if self.ssh_user.is_empty() {
            bail!(Config, "SSH user must not be empty");
        }
        if self.dial_timeout.is_zero() || self.ready_timeout.is_zero() {
            bail!(Config, "timeouts must be greater than 0");
        }
        if let HostKeyCheck::Fingerprint(fp) = &self.host_key {
            if !fp.starts_with("SHA256:") {
                bail!(Config, "host key fingerprint {:?} must start with SHA256:", fp);
            }
        }
        Ok(())
    }

    /// Private key to authenticate with, falling back to the per-user default.
    pub fn ssh_key_path(&self) -> Result<PathBuf> {
        match &self.ssh_key {
            Some(key) => Ok(expand_path(key)),
            None => default_ssh_key(),
        }
    }

    /// SSH endpoint for a resolved node address.
    pub fn endpoint(&self, address: &str) -> Result<SshEndpoint> {
        Ok(SshEndpoint {
            host: address.to_string(),
            port: self.ssh_port,
            user: self.ssh_user.clone(),
            private_key_path: self.ssh_key_path()?,
            dial_timeout: self.dial_timeout,
        })
    }
}

/// Load the ordered secret specification list.
pub fn load_spec_file(path: impl AsRef<Path>) -> Result<Vec<SecretSpec>> {
    let file: SecretSpecFile = load_yaml_file(path)?;
    Ok(file.secrets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use toolbox_types::ToolboxError;

    fn config() -> RunConfig {
        RunConfig::new("hosts.json", "kube-1", "secrets.yaml")
    }

    #[test]
    fn test_defaults() {
        let cfg = config();
        assert_eq!(cfg.ssh_user, "root");
        assert_eq!(cfg.ssh_port, 22);
        assert!(cfg.ssh_key.is_none());
        assert_eq!(cfg.ready_timeout, Duration::from_secs(30));
        assert_eq!(cfg.host_key, HostKeyCheck::AcceptAny);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_values() {
        let mut cfg = config();
        cfg.host.clear();
        assert!(matches!(cfg.validate(), Err(ToolboxError::Config(_))));

        let mut cfg = config();
        cfg.host_key = HostKeyCheck::Fingerprint("MD5:aa:bb".to_string());
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_endpoint_uses_config() {
        let mut cfg = config();
        cfg.ssh_port = 2222;
        cfg.ssh_user = "ops".to_string();
        cfg.ssh_key = Some(PathBuf::from("/keys/ops"));
        let ep = cfg.endpoint("2001:db8::11").unwrap();
        assert_eq!(ep.dial_address(), "[2001:db8::11]:2222");
        assert_eq!(ep.user, "ops");
        assert_eq!(ep.private_key_path, PathBuf::from("/keys/ops"));
    }

    #[test]
    fn test_default_key_resolved_only_when_unset() {
        let cfg = config();
        if let Some(home) = dirs::home_dir() {
            assert_eq!(
                cfg.ssh_key_path().unwrap(),
                home.join(".ssh").join("id_ed25519")
            );
        }

        let mut cfg = config();
        cfg.ssh_key = Some(PathBuf::from("/keys/deploy"));
        assert_eq!(cfg.ssh_key_path().unwrap(), PathBuf::from("/keys/deploy"));
    }

    #[test]
    fn test_validate_message_names_fingerprint() {
        let mut cfg = config();
        cfg.host_key = HostKeyCheck::Fingerprint("aa:bb".to_string());
        match cfg.validate() {
            Err(ToolboxError::Config(msg)) => assert!(msg.contains("\"aa:bb\"")),
            other => panic!("expected Config, got {:?}", other),
        }
    }

    #[test]
    fn test_load_spec_file_keeps_order() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "secrets:\n  - {{path: secret/b, type: random}}\n  - {{path: secret/a, type: manual}}"
        )
        .unwrap();

        let specs = load_spec_file(file.path()).unwrap();
        let paths: Vec<_> = specs.iter().map(|s| s.path.as_str()).collect();
        assert_eq!(paths, vec!["secret/b", "secret/a"]);
    }
}
