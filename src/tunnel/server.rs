//! Server side of the tunnel: accept, read the target, dial it, relay

use super::{recv_target, TunnelError, TunnelSettings};
use crate::proxy::relay;
use crate::stats::Stats;
use crate::transport::{accept_backoff, TcpTransport};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Deadline for the client to announce its target
pub const TARGET_TIMEOUT: Duration = Duration::from_secs(10);

struct Shared {
    transport: TcpTransport,
    settings: TunnelSettings,
    target_timeout: Duration,
}

/// Tunnel server accepting one stream per connection
pub struct TunnelServer {
    listener: TcpListener,
    shared: Arc<Shared>,
    max_connections: usize,
}

impl TunnelServer {
    /// Bind the listening socket
    pub async fn bind(
        addr: &str,
        transport: TcpTransport,
        settings: TunnelSettings,
        max_connections: usize,
    ) -> Result<Self, TunnelError> {
        let listener = transport
            .listen(addr)
            .await
            .map_err(|e| TunnelError::Dial(format!("bind {}: {}", addr, e)))?;

        Ok(Self {
            listener,
            shared: Arc::new(Shared {
                transport,
                settings,
                target_timeout: TARGET_TIMEOUT,
            }),
            max_connections: max_connections.max(1),
        })
    }

    /// Override the target-header deadline
    pub fn with_target_timeout(mut self, timeout: Duration) -> Self {
        if let Some(shared) = Arc::get_mut(&mut self.shared) {
            shared.target_timeout = timeout;
        }
        self
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until `shutdown` resolves
    ///
    /// Connections already being relayed are left to finish on their own.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), TunnelError>
    where
        F: Future<Output = ()>,
    {
        let semaphore = Arc::new(Semaphore::new(self.max_connections));
        tokio::pin!(shutdown);

        info!("Tunnel server listening on {}", self.listener.local_addr()?);

        loop {
            let permit = tokio::select! {
                _ = &mut shutdown => break,
                permit = semaphore.clone().acquire_owned() => {
                    permit.map_err(|_| TunnelError::Closed)?
                }
            };

            let accepted = tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.shared.transport.accept(&self.listener) => accepted,
            };

            match accepted {
                Ok((stream, peer)) => {
                    debug!("New tunnel connection from {}", peer);
                    let shared = Arc::clone(&self.shared);
                    tokio::spawn(async move {
                        let _permit = permit;
                        if let Err(e) = handle_connection(stream, peer, shared).await {
                            match e {
                                TunnelError::Authentication => {
                                    warn!("Rejected {}: {}", peer, e)
                                }
                                _ => debug!("Connection from {} ended: {}", peer, e),
                            }
                        }
                    });
                }
                Err(e) => accept_backoff(&e).await,
            }
        }

        info!("Tunnel server shutting down");
        Ok(())
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    shared: Arc<Shared>,
) -> Result<(), TunnelError> {
    let conn = shared.settings.wrap(stream);

    let target = tokio::time::timeout(shared.target_timeout, recv_target(&conn))
        .await
        .map_err(|_| TunnelError::Timeout("target header"))??;

    debug!("{} requested {}", peer, target);

    let remote = shared.transport.connect(&target).await.map_err(|e| {
        Stats::global().record_dial_failure();
        TunnelError::Dial(e.to_string())
    })?;

    let (sent, received) = relay(remote, &conn).await?;
    debug!(
        "Relay {} <-> {} finished ({} bytes up, {} bytes down)",
        peer, target, sent, received
    );
    Ok(())
}
