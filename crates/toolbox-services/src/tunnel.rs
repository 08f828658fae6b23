//! SSH tunnel to a cluster service.
//!
//! [`TunnelSession::connect`] brings the pieces up in order: SSH session,
//! remote `kubectl port-forward` helper, local listener on an ephemeral
//! loopback port, startup confirmation, relay acceptor. A failure at any
//! step releases what was already acquired, in reverse order.
//! [`TunnelSession::close`] tears everything down and reports every step
//! that failed.

use async_trait::async_trait;
use std::future::Future;
use std::net::{Ipv4Addr, SocketAddr};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::Instant;
use toolbox_types::{
    CommandOutput, CommandRunner, ForwardTarget, Result, SshEndpoint, ToolboxError,
};
use tracing::{debug, info, warn};

use crate::helper::{HelperWatch, RemoteHelper};
use crate::relay::{RelayAcceptor, RemoteDialer};
use crate::ssh::{HostKeyPolicy, SshConnection};

const PROBE_INTERVAL: Duration = Duration::from_millis(100);

type CloseStep<'a> = (&'static str, Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>);

/// How long to watch the helper before declaring the tunnel usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartupCheck {
    /// Window in which an early helper exit is reported as a startup failure
    pub grace: Duration,
    /// How long to probe the forwarded port before proceeding on the grace
    /// window alone; zero skips probing
    pub probe_window: Duration,
}

impl Default for StartupCheck {
    fn default() -> Self {
        Self {
            grace: Duration::from_millis(500),
            probe_window: Duration::from_secs(10),
        }
    }
}

/// A live tunnel: local loopback port relayed to the node's forward.
#[derive(Debug)]
pub struct TunnelSession {
    connection: SshConnection,
    helper: RemoteHelper,
    acceptor: RelayAcceptor,
}

impl TunnelSession {
    /// Dial `endpoint` and expose `target` on a local port.
    pub async fn connect(
        endpoint: &SshEndpoint,
        target: &ForwardTarget,
        policy: Arc<dyn HostKeyPolicy>,
        startup: StartupCheck,
    ) -> Result<Self> {
        let connection = SshConnection::dial(endpoint, policy).await?;
        info!(address = %connection.address(), user = %endpoint.user, "SSH session established");

        let mut helper = match RemoteHelper::start(&connection, target.helper_command()).await {
            Ok(helper) => helper,
            Err(e) => return Err(abandon(None, connection, e).await),
        };

        let listener = match TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await {
            Ok(listener) => listener,
            Err(e) => return Err(abandon(Some(helper), connection, e.into()).await),
        };

        let dialer = connection.dialer(target.remote_port);
        if let Err(e) = confirm_started(&mut helper, &dialer, startup).await {
            drop(listener);
            return Err(abandon(Some(helper), connection, e).await);
        }

        let acceptor = match RelayAcceptor::spawn(listener, dialer) {
            Ok(acceptor) => acceptor,
            Err(e) => return Err(abandon(Some(helper), connection, e.into()).await),
        };
        info!(
            local = %acceptor.local_addr(),
            service = %target.service_name,
            "tunnel ready"
        );

        Ok(Self {
            connection,
            helper,
            acceptor,
        })
    }

    /// Loopback address clients use to reach the forwarded service.
    pub fn local_addr(&self) -> SocketAddr {
        self.acceptor.local_addr()
    }

    /// Tear the tunnel down: listener, then helper, then SSH session.
    ///
    /// Every step runs even if an earlier one fails.
    pub async fn close(self) -> Result<()> {
        let Self {
            connection,
            helper,
            acceptor,
        } = self;

        let result = run_close_steps(vec![
            ("close listener", Box::pin(acceptor.close())),
            ("stop remote helper", Box::pin(helper.stop())),
            ("disconnect", Box::pin(connection.disconnect())),
        ])
        .await;
        if result.is_ok() {
            info!("tunnel closed");
        }
        result
    }
}

#[async_trait]
impl CommandRunner for TunnelSession {
    async fn run_command(&self, command: &str) -> Result<CommandOutput> {
        self.connection.run_command(command).await
    }
}

/// Release a partially built tunnel and hand back the original error.
async fn abandon(
    helper: Option<RemoteHelper>,
    connection: SshConnection,
    err: ToolboxError,
) -> ToolboxError {
    if let Some(helper) = helper {
        if let Err(e) = helper.stop().await {
            warn!(error = %e, "stop remote helper after failed connect");
        }
    }
    if let Err(e) = connection.disconnect().await {
        warn!(error = %e, "disconnect after failed connect");
    }
    err
}

/// Fail if the helper dies during startup, else wait for the forwarded
/// port to accept a channel.
///
/// If probing times out while the helper is still running the tunnel is
/// used anyway, on the strength of the grace window.
async fn confirm_started<H: HelperWatch, D: RemoteDialer>(
    helper: &mut H,
    dialer: &D,
    startup: StartupCheck,
) -> Result<()> {
    if let Some(report) = helper.exited_within(startup.grace).await {
        return Err(report.into_error());
    }
    if startup.probe_window.is_zero() {
        return Ok(());
    }

    let deadline = Instant::now() + startup.probe_window;
    loop {
        match dialer.dial().await {
            Ok(stream) => {
                drop(stream);
                debug!("forwarded port accepts connections");
                return Ok(());
            }
            Err(e) if Instant::now() >= deadline => {
                warn!(
                    error = %e,
                    window = ?startup.probe_window,
                    "forwarded port never answered, continuing since helper is still running"
                );
                return Ok(());
            }
            Err(e) => debug!(error = %e, "forwarded port not ready"),
        }
        if let Some(report) = helper.exited_within(PROBE_INTERVAL).await {
            return Err(report.into_error());
        }
    }
}

/// Run teardown steps in order, each one even if an earlier step failed.
async fn run_close_steps(steps: Vec<CloseStep<'_>>) -> Result<()> {
    let mut results = Vec::with_capacity(steps.len());
    for (step, close) in steps {
        let result = close.await;
        if let Err(e) = &result {
            debug!(step, error = %e, "teardown step failed");
        }
        results.push((step, result));
    }
    join_close_errors(results)
}

/// Combine teardown results into one error listing every failed step.
fn join_close_errors(steps: Vec<(&str, Result<()>)>) -> Result<()> {
    let errors: Vec<String> = steps
        .into_iter()
        .filter_map(|(step, result)| result.err().map(|e| format!("{}: {}", step, e)))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ToolboxError::Close(errors))
    }
}
