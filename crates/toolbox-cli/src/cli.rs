//! CLI structure and command definitions.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use toolbox_core::{HostKeyCheck, RunConfig};
use toolbox_types::PromptOrder;

use crate::commands;

#[derive(Parser)]
#[command(name = "toolbox")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Provision cluster Vault secrets through an SSH tunnel", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Only show warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create every secret in a specification that does not exist yet
    Secrets(SecretsArgs),
}

#[derive(Args, Debug)]
pub struct SecretsArgs {
    /// Host directory JSON file
    #[arg(long, env = "TOOLBOX_HOSTS_FILE")]
    pub hosts_file: PathBuf,

    /// Name of the node to tunnel through
    #[arg(long, env = "TOOLBOX_HOST")]
    pub host: String,

    /// Secret specification YAML file
    #[arg(long, env = "TOOLBOX_SPEC")]
    pub spec: PathBuf,

    /// SSH login user
    #[arg(long, env = "TOOLBOX_SSH_USER", default_value = "root")]
    pub ssh_user: String,

    /// SSH private key [default: ~/.ssh/id_ed25519]
    #[arg(long, env = "TOOLBOX_SSH_KEY")]
    pub ssh_key: Option<PathBuf>,

    /// SSH port
    #[arg(long, env = "TOOLBOX_SSH_PORT", default_value_t = 22)]
    pub ssh_port: u16,

    /// Seconds allowed for the SSH dial and handshake
    #[arg(long, env = "TOOLBOX_DIAL_TIMEOUT", default_value_t = 10)]
    pub dial_timeout: u64,

    /// Seconds to wait for Vault to report healthy
    #[arg(long, env = "TOOLBOX_READY_TIMEOUT", default_value_t = 30)]
    pub ready_timeout: u64,

    /// Require the node's host key to have this SHA256 fingerprint
    #[arg(long, env = "TOOLBOX_HOST_KEY_FINGERPRINT", value_name = "SHA256:...")]
    pub host_key_fingerprint: Option<String>,

    /// Prompt for manual secrets after all generated ones are written
    #[arg(long, env = "TOOLBOX_DEFER_MANUAL")]
    pub defer_manual: bool,
}

impl SecretsArgs {
    /// Assemble the run configuration.
    pub fn into_config(self) -> Result<RunConfig> {
        let mut config = RunConfig::new(self.hosts_file, self.host, self.spec);
        config.ssh_user = self.ssh_user;
        config.ssh_key = self.ssh_key;
        config.ssh_port = self.ssh_port;
        config.dial_timeout = Duration::from_secs(self.dial_timeout);
        config.ready_timeout = Duration::from_secs(self.ready_timeout);
        if let Some(fingerprint) = self.host_key_fingerprint {
            config.host_key = HostKeyCheck::Fingerprint(fingerprint);
        }
        if self.defer_manual {
            config.prompt_order = PromptOrder::DeferManual;
        }
        Ok(config)
    }
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Secrets(args) => commands::secrets::run(args.into_config()?).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> SecretsArgs {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Secrets(args) => args,
        }
    }

    #[test]
    fn test_defaults_fill_config() {
        let args = parse(&[
            "toolbox", "secrets", "--hosts-file", "hosts.json", "--host", "kube-1", "--spec",
            "secrets.yaml",
        ]);
        let config = args.into_config().unwrap();
        assert_eq!(config.ssh_user, "root");
        assert_eq!(config.ssh_key, None);
        assert_eq!(config.ssh_port, 22);
        assert_eq!(config.dial_timeout, Duration::from_secs(10));
        assert_eq!(config.ready_timeout, Duration::from_secs(30));
        assert_eq!(config.host_key, HostKeyCheck::AcceptAny);
        assert_eq!(config.prompt_order, PromptOrder::InOrder);
    }

    #[test]
    fn test_flags_override_defaults() {
        let args = parse(&[
            "toolbox",
            "-v",
            "secrets",
            "--hosts-file",
            "hosts.json",
            "--host",
            "kube-2",
            "--spec",
            "secrets.yaml",
            "--ssh-user",
            "ops",
            "--ssh-key",
            "/keys/ops",
            "--ssh-port",
            "2222",
            "--ready-timeout",
            "90",
            "--host-key-fingerprint",
            "SHA256:abc",
            "--defer-manual",
        ]);
        let config = args.into_config().unwrap();
        assert_eq!(config.host, "kube-2");
        assert_eq!(config.ssh_user, "ops");
        assert_eq!(config.ssh_key, Some(PathBuf::from("/keys/ops")));
        assert_eq!(config.ssh_port, 2222);
        assert_eq!(config.ready_timeout, Duration::from_secs(90));
        assert_eq!(
            config.host_key,
            HostKeyCheck::Fingerprint("SHA256:abc".to_string())
        );
        assert_eq!(config.prompt_order, PromptOrder::DeferManual);
    }

    #[test]
    fn test_missing_required_flags() {
        assert!(Cli::try_parse_from(["toolbox", "secrets", "--host", "kube-1"]).is_err());
    }
}
