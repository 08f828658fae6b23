//! # Toolbox Types
//!
//! Core types, traits, and enums shared across all toolbox crates.
//!
//! This crate provides the fundamental building blocks for provisioning
//! secrets through an SSH tunnel, including:
//!
//! - Validated secret locations
//! - Enums for secret kinds, key algorithms, and remote exit states
//! - Core traits for secret stores, remote command runners, prompts, and generators
//! - Error types and result aliases
//!
//! ## Example
//!
//! ```
//! use toolbox_types::{SecretKind, SecretPath};
//!
//! let path = SecretPath::parse("secret/gitea/admin").unwrap();
//! assert_eq!(path.mount(), "secret");
//!
//! let kind: SecretKind = "random".parse().unwrap();
//! assert_eq!(kind, SecretKind::Random);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod identifiers;
pub mod enums;
pub mod traits;
pub mod config;

// Re-export common types for convenience
pub use errors::{ToolboxError, Result};
pub use identifiers::SecretPath;
pub use enums::{ExitInfo, KeyAlgorithm, PromptOrder, SecretKind};
pub use traits::{CommandOutput, CommandRunner, Generator, Prompt, SecretStore};
pub use config::{ForwardTarget, HostRecord, SecretRecord, SecretSpec, SshEndpoint, TokenSource};
