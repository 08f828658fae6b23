//! Core trait definitions for toolbox abstractions.

use async_trait::async_trait;
use crate::config::SecretRecord;
use crate::enums::SecretKind;
use crate::errors::Result;
use crate::identifiers::SecretPath;

/// Trait for versioned key-value secret storage backends.
///
/// Implementers provide access to secret storage systems like HashiCorp
/// Vault's KV v2 engine.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Read the current version of a secret.
    ///
    /// Returns `Ok(None)` when nothing is stored at the path; transport and
    /// permission failures are errors.
    async fn read(&self, path: &SecretPath) -> Result<Option<SecretRecord>>;

    /// Write a new version of a secret.
    async fn write(&self, path: &SecretPath, data: &SecretRecord) -> Result<()>;
}

/// Output of a finished remote command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Combined stdout and stderr
    pub output: String,
    /// How the command ended
    pub exit: crate::enums::ExitInfo,
}

/// Trait for anything that can run a one-shot command on the remote node.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command` to completion.
    ///
    /// Non-zero exits are reported as [`crate::ToolboxError::Command`].
    async fn run_command(&self, command: &str) -> Result<CommandOutput>;
}

/// Trait for asking the operator for a secret value.
pub trait Prompt: Send + Sync {
    /// Show `message` and read one masked line.
    fn secret(&self, message: &str) -> Result<String>;
}

/// Trait for secret material generators.
///
/// Each secret kind (random, ssh, manual) implements this trait.
pub trait Generator: Send + Sync {
    /// Get the secret kind.
    fn kind(&self) -> SecretKind;

    /// Produce the fields of a fresh record.
    fn generate(&self) -> Result<SecretRecord>;
}
