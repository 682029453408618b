//! Socket tuning
//!
//! Tuning is advisory: a connection that does not expose a kernel socket is
//! left alone, and an option the kernel refuses is logged and skipped.

use crate::config::Tunables;
use crate::tunnel::EncryptedConn;
use socket2::{SockRef, TcpKeepalive};
use std::time::Duration;
use tracing::{debug, warn};

/// Access to the kernel socket behind a connection, if there is one
pub trait SocketOptions {
    fn socket(&self) -> Option<SockRef<'_>>;
}

impl SocketOptions for tokio::net::TcpStream {
    fn socket(&self) -> Option<SockRef<'_>> {
        Some(SockRef::from(self))
    }
}

impl SocketOptions for std::net::TcpStream {
    fn socket(&self) -> Option<SockRef<'_>> {
        Some(SockRef::from(self))
    }
}

impl SocketOptions for tokio::io::DuplexStream {
    fn socket(&self) -> Option<SockRef<'_>> {
        None
    }
}

impl<S> SocketOptions for EncryptedConn<S> {
    fn socket(&self) -> Option<SockRef<'_>> {
        None
    }
}

/// Apply keepalive, nodelay and kernel buffer sizes from `tunables`
///
/// Returns whether a socket was found to tune.
pub fn tune<C>(conn: &C, tunables: &Tunables) -> bool
where
    C: SocketOptions + ?Sized,
{
    let Some(sock) = conn.socket() else {
        debug!("Connection exposes no socket, skipping tuning");
        return false;
    };

    if tunables.tcp_keepalive_secs > 0 {
        let period = Duration::from_secs(tunables.tcp_keepalive_secs);
        let keepalive = TcpKeepalive::new().with_time(period);
        #[cfg(any(target_os = "linux", target_os = "macos", windows))]
        let keepalive = keepalive.with_interval(period);

        if let Err(e) = sock.set_tcp_keepalive(&keepalive) {
            warn!("Failed to set TCP keepalive: {}", e);
        }
    }

    if let Err(e) = sock.set_nodelay(tunables.tcp_nodelay) {
        warn!("Failed to set TCP_NODELAY: {}", e);
    }

    if tunables.tcp_read_buffer > 0 {
        if let Err(e) = sock.set_recv_buffer_size(tunables.tcp_read_buffer) {
            warn!(
                "Failed to set receive buffer to {} bytes: {}",
                tunables.tcp_read_buffer, e
            );
        }
    }

    if tunables.tcp_write_buffer > 0 {
        if let Err(e) = sock.set_send_buffer_size(tunables.tcp_write_buffer) {
            warn!(
                "Failed to set send buffer to {} bytes: {}",
                tunables.tcp_write_buffer, e
            );
        }
    }

    true
}
