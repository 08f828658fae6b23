//! # Toolbox Secrets
//!
//! Secret generation and idempotent provisioning.
//!
//! Provides generators for every supported secret type:
//! - Random alphanumeric strings
//! - SSH keypairs (Ed25519, RSA)
//! - Operator-supplied values
//!
//! and the [`SecretEngine`] that writes whatever does not exist yet.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod engine;
pub mod types;

pub use engine::{validate_specs, ProvisionReport, SecretEngine};
pub use types::*;
