//! Client side of the tunnel: one physical connection per logical stream

use super::{send_target, StreamOpener, TunnelError, TunnelSettings, TunnelStream};
use crate::stats::Stats;
use crate::transport::TcpTransport;
use async_trait::async_trait;
use tracing::debug;

/// Opens streams by dialing the tunnel server and announcing the target
#[derive(Debug, Clone)]
pub struct TunnelDialer {
    server_addr: String,
    transport: TcpTransport,
    settings: TunnelSettings,
}

impl TunnelDialer {
    pub fn new(
        server_addr: impl Into<String>,
        transport: TcpTransport,
        settings: TunnelSettings,
    ) -> Self {
        Self {
            server_addr: server_addr.into(),
            transport,
            settings,
        }
    }

    pub fn server_addr(&self) -> &str {
        &self.server_addr
    }
}

#[async_trait]
impl StreamOpener for TunnelDialer {
    async fn open_stream(&self, target: &str) -> Result<Box<dyn TunnelStream>, TunnelError> {
        let stream = self.transport.connect(&self.server_addr).await.map_err(|e| {
            Stats::global().record_dial_failure();
            TunnelError::Dial(e.to_string())
        })?;

        let conn = self.settings.wrap(stream);
        send_target(&conn, target).await?;
        debug!("Opened tunnel stream to {} via {}", target, self.server_addr);

        Ok(Box::new(conn))
    }
}
