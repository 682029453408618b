//! TCP transport

use super::{tune, TransportConfig, TransportError};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tracing::debug;

/// Dials and accepts tuned TCP connections
#[derive(Debug, Clone, Default)]
pub struct TcpTransport {
    config: TransportConfig,
}

impl TcpTransport {
    /// Create a new TCP transport
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Connect to `addr` within the configured timeout and tune the socket
    pub async fn connect(&self, addr: &str) -> Result<TcpStream, TransportError> {
        let stream = tokio::time::timeout(self.config.connect_timeout(), TcpStream::connect(addr))
            .await
            .map_err(|_| TransportError::Timeout(addr.to_string()))?
            .map_err(|e| TransportError::ConnectionFailed(addr.to_string(), e))?;

        debug!("Connected to {}", addr);
        tune(&stream, &self.config.tunables);
        Ok(stream)
    }

    /// Bind a listener
    pub async fn listen<A: ToSocketAddrs>(&self, addr: A) -> Result<TcpListener, TransportError> {
        Ok(TcpListener::bind(addr).await?)
    }

    /// Accept one connection and tune it
    pub async fn accept(
        &self,
        listener: &TcpListener,
    ) -> Result<(TcpStream, std::net::SocketAddr), TransportError> {
        let (stream, peer) = listener.accept().await?;
        tune(&stream, &self.config.tunables);
        Ok((stream, peer))
    }
}
