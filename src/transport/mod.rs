//! Transport layer
//!
//! Provides:
//! - TCP connect/listen with connect timeouts
//! - Socket tuning from resolved [`Tunables`](crate::config::Tunables)
//! - Backoff for accept loops

mod tcp;
mod tuner;

pub use tcp::TcpTransport;
pub use tuner::{tune, SocketOptions};

use crate::config::Tunables;
use std::io;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Pause after a failed `accept` before the loop tries again
pub const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Transport layer errors
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Connection to {0} failed: {1}")]
    ConnectionFailed(String, io::Error),

    #[error("Connection to {0} timed out")]
    Timeout(String),
}

/// Transport configuration
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Connection timeout in seconds
    pub connect_timeout: u64,
    /// Socket options applied to every connection
    pub tunables: Tunables,
}

impl TransportConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: 10,
            tunables: Tunables::default(),
        }
    }
}

/// Log a failed `accept` and wait [`ACCEPT_BACKOFF`]
pub async fn accept_backoff<E: std::fmt::Display>(error: &E) {
    warn!("Accept error: {}, retrying in {:?}", error, ACCEPT_BACKOFF);
    tokio::time::sleep(ACCEPT_BACKOFF).await;
}
