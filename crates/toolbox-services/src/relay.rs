//! Local listener relayed to a remote endpoint.
//!
//! [`RelayAcceptor`] owns a bound listener and serves each accepted
//! connection on its own task: dial the remote side through a
//! [`RemoteDialer`], then copy bytes in both directions until either side
//! finishes. A failing connection never affects the listener or other
//! connections.

use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};
use toolbox_types::{Result, ToolboxError};
use tracing::{debug, warn};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// Opens a fresh stream to the remote side for every relayed connection.
#[async_trait]
pub trait RemoteDialer: Send + Sync + 'static {
    /// Stream type produced by [`RemoteDialer::dial`].
    type Stream: AsyncRead + AsyncWrite + Send + 'static;

    /// Open one remote stream.
    async fn dial(&self) -> io::Result<Self::Stream>;
}

/// Bytes moved by one relayed connection.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RelayStats {
    /// Local to remote
    pub sent: u64,
    /// Remote to local
    pub received: u64,
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Sent,
    Received,
}

/// Copy bytes between `local` and `remote` until both directions finish.
///
/// Each direction half-closes its destination when its source reaches end
/// of stream. An error in either direction tears down both.
pub async fn relay<L, R>(local: L, remote: R) -> RelayStats
where
    L: AsyncRead + AsyncWrite + Send + 'static,
    R: AsyncRead + AsyncWrite + Send + 'static,
{
    let (mut local_rd, mut local_wr) = tokio::io::split(local);
    let (mut remote_rd, mut remote_wr) = tokio::io::split(remote);

    let mut pair = JoinSet::new();
    pair.spawn(async move { (Direction::Sent, pump(&mut local_rd, &mut remote_wr).await) });
    pair.spawn(async move { (Direction::Received, pump(&mut remote_rd, &mut local_wr).await) });

    let mut stats = RelayStats::default();
    while let Some(joined) = pair.join_next().await {
        match joined {
            Ok((Direction::Sent, Ok(n))) => stats.sent = n,
            Ok((Direction::Received, Ok(n))) => stats.received = n,
            Ok((direction, Err(e))) => {
                debug!(?direction, error = %e, "relay copy failed, closing connection");
                pair.abort_all();
            }
            Err(e) if e.is_cancelled() => {}
            Err(e) => warn!(error = %e, "relay task panicked"),
        }
    }
    stats
}

async fn pump<Rd, Wr>(reader: &mut Rd, writer: &mut Wr) -> io::Result<u64>
where
    Rd: AsyncRead + Unpin,
    Wr: AsyncWrite + Unpin,
{
    let n = tokio::io::copy(reader, writer).await?;
    writer.shutdown().await?;
    Ok(n)
}

/// Accept loop running on a background task.
#[derive(Debug)]
pub struct RelayAcceptor {
    local_addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl RelayAcceptor {
    /// Start serving `listener`, dialing the remote side with `dialer`.
    pub fn spawn<D: RemoteDialer>(listener: TcpListener, dialer: D) -> io::Result<Self> {
        let local_addr = listener.local_addr()?;
        let (shutdown, signal) = oneshot::channel();
        let task = tokio::spawn(accept_loop(listener, Arc::new(dialer), signal));
        debug!(%local_addr, "relay listening");
        Ok(Self {
            local_addr,
            shutdown: Some(shutdown),
            task: Some(task),
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting and release the listener.
    ///
    /// Connections already being relayed run until either side closes.
    pub async fn close(mut self) -> Result<()> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            task.await.map_err(|e| {
                ToolboxError::Io(io::Error::other(format!("relay acceptor: {}", e)))
            })?;
        }
        Ok(())
    }
}

impl Drop for RelayAcceptor {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn accept_loop<D: RemoteDialer>(
    listener: TcpListener,
    dialer: Arc<D>,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                debug!("relay listener closed");
                return;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    tokio::spawn(serve(stream, peer, Arc::clone(&dialer)));
                }
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            },
        }
    }
}

async fn serve<D: RemoteDialer>(local: TcpStream, peer: SocketAddr, dialer: Arc<D>) {
    let remote = match dialer.dial().await {
        Ok(remote) => remote,
        Err(e) => {
            warn!(%peer, error = %e, "dial remote target failed");
            return;
        }
    };
    let stats = relay(local, remote).await;
    debug!(%peer, sent = stats.sent, received = stats.received, "relayed connection finished");
}
