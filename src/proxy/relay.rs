//! Bidirectional copy between a local socket and a tunnel stream

use crate::stats::Stats;
use crate::tunnel::{BufferPool, TunnelError, TunnelStream};
use tokio::io::{split, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// Copy both ways until either side closes or fails, then close both
///
/// Returns `(bytes io -> tunnel, bytes tunnel -> io)`.
pub async fn relay<S, T>(io: S, tunnel: &T) -> Result<(u64, u64), TunnelError>
where
    S: AsyncRead + AsyncWrite + Send,
    T: TunnelStream + ?Sized,
{
    let stats = Stats::global();
    let _active = stats.relay_started();

    let (mut reader, mut writer) = split(io);
    let mut sent = 0u64;
    let mut received = 0u64;

    let result = {
        let upstream = async {
            let mut buf = BufferPool::global().acquire();
            loop {
                let n = reader.read(&mut buf).await?;
                if n == 0 {
                    return Ok::<(), TunnelError>(());
                }
                tunnel.write_all(&buf[..n]).await?;
                sent += n as u64;
                stats.add_sent(n);
            }
        };

        let downstream = async {
            let mut buf = BufferPool::global().acquire();
            loop {
                let n = tunnel.read(&mut buf).await?;
                if n == 0 {
                    return Ok::<(), TunnelError>(());
                }
                writer.write_all(&buf[..n]).await?;
                received += n as u64;
                stats.add_received(n);
            }
        };

        tokio::select! {
            r = upstream => r,
            r = downstream => r,
        }
    };

    if let Err(e) = tunnel.close().await {
        debug!("Closing tunnel stream: {}", e);
    }
    if let Err(e) = writer.shutdown().await {
        debug!("Closing local stream: {}", e);
    }

    result.map(|()| (sent, received))
}
