//! Long-running forwarding helper on the remote node.
//!
//! The helper is a command (normally `kubectl port-forward`) executed on a
//! dedicated session channel. A monitor task owns that channel, captures
//! everything it prints, and reports how it ended.

use async_trait::async_trait;
use russh::client::Msg;
use russh::{Channel, Sig};
use std::future::Future;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use toolbox_types::{ExitInfo, Result, ToolboxError};
use tracing::{debug, info, warn};

use crate::ssh::{ChannelCapture, SshConnection};

const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// How the helper ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperReport {
    /// Exit state reported by the remote side
    pub exit: ExitInfo,
    /// Everything the helper printed
    pub output: String,
    /// Whether the helper ended because we asked it to
    pub stopped: bool,
}

impl HelperReport {
    /// The startup failure this report represents.
    pub fn into_error(self) -> ToolboxError {
        ToolboxError::RemoteHelperFailed {
            exit: self.exit,
            output: self.output,
        }
    }
}

/// Liveness of a started helper, as seen while the tunnel comes up.
#[async_trait]
pub trait HelperWatch: Send {
    /// Wait up to `window` for the helper to exit on its own.
    ///
    /// Returns `None` while it is still running.
    async fn exited_within(&mut self, window: Duration) -> Option<HelperReport>;
}

/// A remote command kept running for the lifetime of the tunnel.
#[derive(Debug)]
pub struct RemoteHelper {
    stop: Option<oneshot::Sender<()>>,
    monitor: Option<JoinHandle<HelperReport>>,
}

impl RemoteHelper {
    /// Run `command` on a new session channel of `connection`.
    pub async fn start(connection: &SshConnection, command: impl Into<String>) -> Result<Self> {
        let command = command.into();
        let channel = connection.open_session().await?;
        channel
            .exec(true, command.as_str())
            .await
            .map_err(|e| ToolboxError::Ssh(format!("start remote helper: {}", e)))?;

        info!(command = %command, "remote helper started");
        Ok(Self::watch(move |signal| monitor(channel, signal)))
    }

    /// Spawn `body` as the monitor task; it receives the stop signal.
    fn watch<F, Fut>(body: F) -> Self
    where
        F: FnOnce(oneshot::Receiver<()>) -> Fut,
        Fut: Future<Output = HelperReport> + Send + 'static,
    {
        let (stop, signal) = oneshot::channel();
        Self {
            stop: Some(stop),
            monitor: Some(tokio::spawn(body(signal))),
        }
    }

    /// Terminate the helper and wait for its channel to close.
    pub async fn stop(mut self) -> Result<()> {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        let Some(monitor) = self.monitor.take() else {
            debug!("remote helper already exited");
            return Ok(());
        };

        match tokio::time::timeout(STOP_TIMEOUT, monitor).await {
            Ok(Ok(report)) if !report.stopped => {
                warn!(exit = %report.exit, output = %report.output.trim(), "remote helper exited before stop");
                Ok(())
            }
            Ok(Ok(_)) => {
                debug!("remote helper stopped");
                Ok(())
            }
            Ok(Err(e)) => Err(ToolboxError::Ssh(format!("remote helper monitor: {}", e))),
            Err(_) => Err(ToolboxError::Ssh(format!(
                "remote helper did not stop within {:?}",
                STOP_TIMEOUT
            ))),
        }
    }
}

#[async_trait]
impl HelperWatch for RemoteHelper {
    async fn exited_within(&mut self, window: Duration) -> Option<HelperReport> {
        let monitor = self.monitor.as_mut()?;
        match tokio::time::timeout(window, monitor).await {
            Ok(joined) => {
                self.monitor = None;
                Some(joined.unwrap_or_else(|e| HelperReport {
                    exit: ExitInfo::Unknown,
                    output: format!("helper monitor failed: {}", e),
                    stopped: false,
                }))
            }
            Err(_) => None,
        }
    }
}

impl Drop for RemoteHelper {
    fn drop(&mut self) {
        if let Some(monitor) = self.monitor.take() {
            monitor.abort();
        }
    }
}

async fn monitor(mut channel: Channel<Msg>, mut stop: oneshot::Receiver<()>) -> HelperReport {
    let mut capture = ChannelCapture::default();
    loop {
        tokio::select! {
            _ = &mut stop => {
                if let Err(e) = channel.signal(Sig::TERM).await {
                    debug!(error = %e, "signal remote helper");
                }
                if let Err(e) = channel.close().await {
                    debug!(error = %e, "close remote helper channel");
                }
                let (exit, output) = capture.finish();
                return HelperReport { exit, output, stopped: true };
            }
            msg = channel.wait() => match msg {
                Some(msg) => capture.record(msg),
                None => {
                    let (exit, output) = capture.finish();
                    debug!(%exit, "remote helper channel closed");
                    return HelperReport { exit, output, stopped: false };
                }
            },
        }
    }
}
