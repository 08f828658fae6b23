//! Secret-store bootstrap: root token retrieval and readiness polling.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::time::Instant;
use toolbox_types::{CommandRunner, Result, TokenSource, ToolboxError};
use tracing::{debug, info};

use crate::vault::{VaultClient, VaultConfig};

/// Delay between health checks.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Read the base64 encoded root token from the cluster secret named by
/// `source`, running `kubectl` on the node through `runner`.
pub async fn fetch_bootstrap_token(
    runner: &dyn CommandRunner,
    source: &TokenSource,
) -> Result<String> {
    let output = runner.run_command(&source.fetch_command()).await?;
    let token = decode_token(&output.output)?;
    debug!(secret = %source.secret_name, "bootstrap token retrieved");
    Ok(token)
}

fn decode_token(raw: &str) -> Result<String> {
    let bytes = STANDARD
        .decode(raw.trim())
        .map_err(|e| ToolboxError::TokenDecode(e.to_string()))?;
    let token = String::from_utf8(bytes)
        .map_err(|e| ToolboxError::TokenDecode(format!("not UTF-8: {}", e)))?;
    if token.is_empty() {
        return Err(ToolboxError::TokenDecode("token is empty".to_string()));
    }
    Ok(token)
}

/// Poll the store behind `local_addr` until it is initialized and unsealed.
///
/// Returns a client authenticated with `token`. Gives up after `timeout`
/// with [`ToolboxError::ReadinessTimeout`] carrying the last failure.
pub async fn wait_until_ready(
    local_addr: SocketAddr,
    token: &str,
    timeout: Duration,
) -> Result<VaultClient> {
    wait_until_ready_every(local_addr, token, timeout, POLL_INTERVAL).await
}

pub(crate) async fn wait_until_ready_every(
    local_addr: SocketAddr,
    token: &str,
    timeout: Duration,
    interval: Duration,
) -> Result<VaultClient> {
    let client = VaultClient::new(VaultConfig::for_tunnel(local_addr, token))?;
    let started = Instant::now();

    loop {
        let last_error = match client.health().await {
            Ok(health) if health.is_ready() => {
                info!(url = %client.url(), "Vault is ready");
                return Ok(client);
            }
            Ok(health) => format!(
                "initialized={} sealed={}",
                health.initialized, health.sealed
            ),
            Err(e) => e.to_string(),
        };
        debug!(reason = %last_error, "Vault not ready");

        let elapsed = started.elapsed();
        if elapsed >= timeout {
            return Err(ToolboxError::ReadinessTimeout {
                elapsed,
                last_error,
            });
        }
        tokio::time::sleep(interval.min(timeout - elapsed)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::testing::fake_vault;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use toolbox_types::{CommandOutput, ExitInfo};

    struct FakeRunner {
        reply: Result<String>,
        seen: Mutex<Vec<String>>,
    }

    impl FakeRunner {
        fn new(reply: Result<String>) -> Self {
            Self {
                reply,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CommandRunner for FakeRunner {
        async fn run_command(&self, command: &str) -> Result<CommandOutput> {
            self.seen.lock().unwrap().push(command.to_string());
            match &self.reply {
                Ok(output) => Ok(CommandOutput {
                    output: output.clone(),
                    exit: ExitInfo::Status(0),
                }),
                Err(_) => Err(ToolboxError::Command {
                    command: command.to_string(),
                    exit: ExitInfo::Status(1),
                    output: "Error from server (NotFound): secrets \"vault-unseal-keys\" not found"
                        .to_string(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn test_fetch_decodes_token() {
        let runner = FakeRunner::new(Ok("cy5yb290dG9rZW4=\n".to_string()));
        let token = fetch_bootstrap_token(&runner, &TokenSource::default())
            .await
            .unwrap();
        assert_eq!(token, "s.roottoken");

        let seen = runner.seen.lock().unwrap();
        assert!(seen[0].starts_with("kubectl get secret vault-unseal-keys -n vault"));
        assert!(seen[0].contains(r#"index .data "vault-root""#));
    }

    #[tokio::test]
    async fn test_fetch_rejects_invalid_base64() {
        let runner = FakeRunner::new(Ok("not base64!!".to_string()));
        let err = fetch_bootstrap_token(&runner, &TokenSource::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolboxError::TokenDecode(_)));
    }

    #[tokio::test]
    async fn test_fetch_passes_command_failure_through() {
        let runner = FakeRunner::new(Err(ToolboxError::Ssh(String::new())));
        let err = fetch_bootstrap_token(&runner, &TokenSource::default())
            .await
            .unwrap_err();
        match err {
            ToolboxError::Command { output, .. } => assert!(output.contains("NotFound")),
            other => panic!("expected Command, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_empty_token() {
        assert!(matches!(decode_token("  \n"), Err(ToolboxError::TokenDecode(_))));
    }

    #[tokio::test]
    async fn test_ready_after_unseal() {
        let polls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&polls);
        let (addr, _) = fake_vault(move |_, _| {
            let sealed = counter.fetch_add(1, Ordering::SeqCst) < 2;
            (
                299,
                format!(r#"{{"initialized":true,"sealed":{}}}"#, sealed),
            )
        })
        .await;

        let client = wait_until_ready_every(
            addr,
            "s.root",
            Duration::from_secs(5),
            Duration::from_millis(20),
        )
        .await
        .unwrap();
        assert_eq!(client.url(), format!("http://{}", addr));
        assert_eq!(polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_timeout_carries_last_error() {
        let (addr, _) = fake_vault(|_, _| {
            (299, r#"{"initialized":false,"sealed":true}"#.to_string())
        })
        .await;

        let err = wait_until_ready_every(
            addr,
            "s.root",
            Duration::from_millis(200),
            Duration::from_millis(20),
        )
        .await
        .unwrap_err();
        match err {
            ToolboxError::ReadinessTimeout { elapsed, last_error } => {
                assert!(elapsed >= Duration::from_millis(200));
                assert_eq!(last_error, "initialized=false sealed=true");
            }
            other => panic!("expected ReadinessTimeout, got {:?}", other),
        }
    }
}
