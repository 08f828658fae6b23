//! SSH sessions to cluster nodes.
//!
//! [`SshConnection`] authenticates with a private key, runs one-shot
//! commands (implementing [`CommandRunner`]) and opens `direct-tcpip`
//! channels for the tunnel relay. Host key verification is delegated to a
//! [`HostKeyPolicy`].

use async_trait::async_trait;
use russh::client::{self, Handle, Msg};
use russh::keys::ssh_key::{HashAlg, PrivateKey, PublicKey};
use russh::keys::{load_secret_key, PrivateKeyWithHashAlg};
use russh::{Channel, ChannelMsg, ChannelStream, Disconnect};
use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use toolbox_types::{CommandOutput, CommandRunner, ExitInfo, Result, SshEndpoint, ToolboxError};
use tracing::{debug, error, warn};

use crate::relay::RemoteDialer;

const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// Decides whether a server host key is trusted.
pub trait HostKeyPolicy: Send + Sync + fmt::Debug {
    /// Return true to continue the handshake with `key`.
    fn verify(&self, host: &str, key: &PublicKey) -> bool;
}

/// Trust any host key the server presents.
///
/// INSECURE: anyone able to intercept the connection can impersonate the
/// node and capture the bootstrap credential. Every accepted key is logged
/// with its fingerprint at warn level.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAnyHostKey;

impl HostKeyPolicy for AcceptAnyHostKey {
    fn verify(&self, host: &str, key: &PublicKey) -> bool {
        warn!(
            host,
            fingerprint = %key.fingerprint(HashAlg::Sha256),
            "accepting unverified SSH host key"
        );
        true
    }
}

/// Trust only a host key with the given `SHA256:<base64>` fingerprint.
#[derive(Debug, Clone)]
pub struct PinnedFingerprint {
    expected: String,
}

impl PinnedFingerprint {
    /// Pin the fingerprint printed by `ssh-keygen -lf`.
    pub fn new(expected: impl Into<String>) -> Self {
        Self {
            expected: expected.into(),
        }
    }
}

impl HostKeyPolicy for PinnedFingerprint {
    fn verify(&self, host: &str, key: &PublicKey) -> bool {
        let actual = key.fingerprint(HashAlg::Sha256).to_string();
        if actual == self.expected {
            debug!(host, fingerprint = %actual, "host key matches pinned fingerprint");
            true
        } else {
            error!(
                host,
                expected = %self.expected,
                actual = %actual,
                "host key does not match pinned fingerprint"
            );
            false
        }
    }
}

/// russh callback handler carrying the host key policy.
pub struct ClientHandler {
    host: String,
    policy: Arc<dyn HostKeyPolicy>,
}

impl client::Handler for ClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        Ok(self.policy.verify(&self.host, server_public_key))
    }
}

/// An authenticated SSH session.
pub struct SshConnection {
    handle: Arc<Handle<ClientHandler>>,
    address: String,
}

impl fmt::Debug for SshConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SshConnection")
            .field("address", &self.address)
            .finish()
    }
}

impl SshConnection {
    /// Dial and authenticate within `endpoint.dial_timeout`.
    pub async fn dial(endpoint: &SshEndpoint, policy: Arc<dyn HostKeyPolicy>) -> Result<Self> {
        let key = load_secret_key(&endpoint.private_key_path, None).map_err(|e| {
            ToolboxError::Ssh(format!(
                "read private key {}: {}",
                endpoint.private_key_path.display(),
                e
            ))
        })?;

        let address = endpoint.dial_address();
        let config = Arc::new(client::Config {
            inactivity_timeout: None,
            keepalive_interval: Some(KEEPALIVE_INTERVAL),
            ..Default::default()
        });
        let handler = ClientHandler {
            host: endpoint.host.clone(),
            policy,
        };

        debug!(address = %address, user = %endpoint.user, "dialing");
        let handle = tokio::time::timeout(
            endpoint.dial_timeout,
            handshake(config, &address, handler, &endpoint.user, key),
        )
        .await
        .map_err(|_| {
            ToolboxError::Ssh(format!(
                "dial {}: timed out after {:?}",
                address, endpoint.dial_timeout
            ))
        })??;

        Ok(Self {
            handle: Arc::new(handle),
            address,
        })
    }

    /// Address this session was dialed on.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Open a session channel for a command.
    pub(crate) async fn open_session(&self) -> Result<Channel<Msg>> {
        self.handle
            .channel_open_session()
            .await
            .map_err(|e| ToolboxError::Ssh(format!("open session on {}: {}", self.address, e)))
    }

    /// A dialer reaching `port` on the node's loopback interface.
    pub fn dialer(&self, port: u16) -> SshDialer {
        SshDialer {
            handle: Arc::clone(&self.handle),
            port,
        }
    }

    /// Close the session.
    pub async fn disconnect(&self) -> Result<()> {
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(|e| ToolboxError::Ssh(format!("disconnect {}: {}", self.address, e)))
    }
}

async fn handshake(
    config: Arc<client::Config>,
    address: &str,
    handler: ClientHandler,
    user: &str,
    key: PrivateKey,
) -> Result<Handle<ClientHandler>> {
    let mut handle = client::connect(config, address, handler)
        .await
        .map_err(|e| ToolboxError::Ssh(format!("dial {}: {}", address, e)))?;

    let hash = handle
        .best_supported_rsa_hash()
        .await
        .map_err(|e| ToolboxError::Ssh(format!("negotiate with {}: {}", address, e)))?
        .flatten();
    let auth = handle
        .authenticate_publickey(user, PrivateKeyWithHashAlg::new(Arc::new(key), hash))
        .await
        .map_err(|e| ToolboxError::Ssh(format!("authenticate {}@{}: {}", user, address, e)))?;

    if !auth.success() {
        return Err(ToolboxError::Ssh(format!(
            "authenticate {}@{}: public key rejected",
            user, address
        )));
    }
    Ok(handle)
}

/// Collects what a command channel produces until it closes.
#[derive(Debug, Default)]
pub(crate) struct ChannelCapture {
    output: Vec<u8>,
    exit: Option<ExitInfo>,
}

impl ChannelCapture {
    /// Record one channel message.
    pub(crate) fn record(&mut self, msg: ChannelMsg) {
        match msg {
            ChannelMsg::Data { ref data } | ChannelMsg::ExtendedData { ref data, .. } => {
                self.output.extend_from_slice(data)
            }
            ChannelMsg::ExitStatus { exit_status } => {
                self.exit = Some(ExitInfo::Status(exit_status))
            }
            ChannelMsg::ExitSignal { signal_name, .. } => {
                self.exit = Some(ExitInfo::Signal(format!("{:?}", signal_name)))
            }
            _ => {}
        }
    }

    /// Captured exit state and combined output.
    pub(crate) fn finish(&self) -> (ExitInfo, String) {
        (
            self.exit.clone().unwrap_or(ExitInfo::Unknown),
            String::from_utf8_lossy(&self.output).into_owned(),
        )
    }
}

#[async_trait]
impl CommandRunner for SshConnection {
    async fn run_command(&self, command: &str) -> Result<CommandOutput> {
        let mut channel = self.open_session().await?;
        channel
            .exec(true, command)
            .await
            .map_err(|e| ToolboxError::Ssh(format!("exec on {}: {}", self.address, e)))?;

        let mut capture = ChannelCapture::default();
        while let Some(msg) = channel.wait().await {
            capture.record(msg);
        }

        let (exit, output) = capture.finish();
        debug!(command, %exit, "remote command finished");
        if !exit.success() {
            return Err(ToolboxError::Command {
                command: command.to_string(),
                exit,
                output,
            });
        }
        Ok(CommandOutput { output, exit })
    }
}

/// Opens `direct-tcpip` channels to a fixed port on the node.
#[derive(Clone)]
pub struct SshDialer {
    handle: Arc<Handle<ClientHandler>>,
    port: u16,
}

impl fmt::Debug for SshDialer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SshDialer").field("port", &self.port).finish()
    }
}

#[async_trait]
impl RemoteDialer for SshDialer {
    type Stream = ChannelStream<Msg>;

    async fn dial(&self) -> io::Result<Self::Stream> {
        let channel = self
            .handle
            .channel_open_direct_tcpip("127.0.0.1", u32::from(self.port), "127.0.0.1", 0)
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::ConnectionRefused, e.to_string()))?;
        Ok(channel.into_stream())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIAECAwQFBgcICQoLDA0ODxAREhMUFRYXGBkaGxwdHh8g";
    const FINGERPRINT: &str = "SHA256:mKqU+0K8OhKmA8bBQi9Rz0Q5l7/g160hIP+rJYSTNj4";

    fn key() -> PublicKey {
        PublicKey::from_openssh(KEY).unwrap()
    }

    #[test]
    fn test_accept_any_trusts_everything() {
        assert!(AcceptAnyHostKey.verify("node", &key()));
    }

    #[test]
    fn test_pinned_fingerprint() {
        assert!(PinnedFingerprint::new(FINGERPRINT).verify("node", &key()));
        assert!(!PinnedFingerprint::new("SHA256:AAAA").verify("node", &key()));
    }

    #[test]
    fn test_capture_combines_streams() {
        let mut capture = ChannelCapture::default();
        capture.record(ChannelMsg::Data {
            data: russh::CryptoVec::from_slice(b"out "),
        });
        capture.record(ChannelMsg::ExtendedData {
            data: russh::CryptoVec::from_slice(b"err"),
            ext: 1,
        });
        capture.record(ChannelMsg::ExitStatus { exit_status: 3 });

        let (exit, output) = capture.finish();
        assert_eq!(exit, ExitInfo::Status(3));
        assert_eq!(output, "out err");
    }

    #[test]
    fn test_capture_without_exit_status() {
        let (exit, output) = ChannelCapture::default().finish();
        assert_eq!(exit, ExitInfo::Unknown);
        assert!(output.is_empty());
    }
}
