//! # Toolbox Services
//!
//! Network plumbing between the operator's machine and the secret store.
//!
//! This crate provides:
//! - **SSH**: authenticated sessions to a cluster node, one-shot remote commands
//! - **Tunnel**: a local listener relayed to a `kubectl port-forward` helper on the node
//! - **Vault**: a KV v2 client with health checks
//! - **Bootstrap**: fetching the root token and waiting for the store to become ready

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bootstrap;
pub mod helper;
pub mod relay;
pub mod ssh;
pub mod tunnel;
pub mod vault;

pub use bootstrap::{fetch_bootstrap_token, wait_until_ready};
pub use relay::{relay, RelayAcceptor, RelayStats, RemoteDialer};
pub use ssh::{AcceptAnyHostKey, HostKeyPolicy, PinnedFingerprint, SshConnection, SshDialer};
pub use tunnel::{StartupCheck, TunnelSession};
pub use vault::{VaultClient, VaultConfig, VaultHealth};
