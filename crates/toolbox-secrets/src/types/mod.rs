//! Secret type implementations.

pub mod manual;
pub mod random;
pub mod ssh;

pub use manual::ManualSecret;
pub use random::RandomSecret;
pub use ssh::SshSecret;

use std::sync::Arc;
use toolbox_types::{Generator, KeyAlgorithm, Prompt, Result, SecretKind, SecretPath, SecretSpec};

/// Field holding the value of `random` and `manual` secrets.
pub const VALUE_FIELD: &str = "value";
/// Field holding the PEM private key of `ssh` secrets.
pub const PRIVATE_KEY_FIELD: &str = "private_key";
/// Field holding the `authorized_keys` line of `ssh` secrets.
pub const PUBLIC_KEY_FIELD: &str = "public_key";

/// Fields a stored record of `kind` is expected to carry.
pub fn canonical_fields(kind: SecretKind) -> &'static [&'static str] {
    match kind {
        SecretKind::Random | SecretKind::Manual => &[VALUE_FIELD],
        SecretKind::Ssh => &[PRIVATE_KEY_FIELD, PUBLIC_KEY_FIELD],
    }
}

/// Factory function to create a generator from a specification entry.
///
/// Unknown types and algorithms are [`toolbox_types::ToolboxError::Unsupported`].
pub fn create_generator(
    spec: &SecretSpec,
    path: &SecretPath,
    prompt: Arc<dyn Prompt>,
) -> Result<Box<dyn Generator>> {
    match spec.kind.parse::<SecretKind>()? {
        SecretKind::Random => Ok(Box::new(RandomSecret::new(spec.length))),
        SecretKind::Ssh => {
            let algorithm = match &spec.algorithm {
                Some(name) => name.parse()?,
                None => KeyAlgorithm::default(),
            };
            Ok(Box::new(SshSecret::new(algorithm)))
        }
        SecretKind::Manual => Ok(Box::new(ManualSecret::new(
            path,
            spec.description.clone(),
            prompt,
        ))),
    }
}
