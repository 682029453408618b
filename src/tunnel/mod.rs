//! Tunnel layer - encrypted communication channel
//!
//! Provides:
//! - Length-prefixed frame encoding/decoding
//! - [`EncryptedConn`]: compress, pad, seal and frame every write
//! - Pooled frame buffers
//! - The [`StreamOpener`] capability and a one-connection-per-stream provider

mod compress;
mod conn;
mod dialer;
mod frame;
mod pool;
mod server;
mod target;

pub use compress::{compress_into, decompress, MAX_COMPRESSIBLE_CHUNK};
pub use conn::{EncryptedConn, TunnelSettings};
pub use dialer::TunnelDialer;
pub use frame::{decode_header, encode_header, read_header, FRAME_HEADER_SIZE, MAX_FRAME_LEN};
pub use pool::{BufferPool, PooledBuffer, DEFAULT_BUFFER_SIZE, DEFAULT_MAX_BUFFERS};
pub use server::TunnelServer;
pub use target::{recv_target, send_target, MAX_TARGET_LEN, TARGET_SCHEME};

use async_trait::async_trait;
use thiserror::Error;

/// Tunnel layer errors
#[derive(Debug, Error)]
pub enum TunnelError {
    #[error("Framing error: {0}")]
    Framing(String),

    #[error("Authentication failed: frame tag mismatch")]
    Authentication,

    #[error("Compression error: {0}")]
    Compression(String),

    #[error("Dial failed: {0}")]
    Dial(String),

    #[error("Timed out: {0}")]
    Timeout(&'static str),

    #[error("Stream closed")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Crypto error: {0}")]
    Crypto(#[from] crate::crypto::CryptoError),
}

/// Largest payload a single frame write consumes
pub const MAX_FRAME_PAYLOAD: usize = 65535;

/// A bidirectional byte stream carried over the tunnel
#[async_trait]
pub trait TunnelStream: Send + Sync {
    /// Read up to `buf.len()` bytes; `Ok(0)` means the peer closed
    async fn read(&self, buf: &mut [u8]) -> Result<usize, TunnelError>;

    /// Write a prefix of `data`, returning how many bytes were consumed
    async fn write(&self, data: &[u8]) -> Result<usize, TunnelError>;

    /// Shut down the stream
    async fn close(&self) -> Result<(), TunnelError>;

    /// Write all of `data`
    async fn write_all(&self, mut data: &[u8]) -> Result<(), TunnelError> {
        while !data.is_empty() {
            let n = self.write(data).await?;
            if n == 0 {
                return Err(TunnelError::Closed);
            }
            data = &data[n..];
        }
        Ok(())
    }

    /// Fill `buf` completely
    async fn read_exact(&self, buf: &mut [u8]) -> Result<(), TunnelError> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read(&mut buf[filled..]).await?;
            if n == 0 {
                return Err(TunnelError::Framing(format!(
                    "stream ended after {} of {} bytes",
                    filled,
                    buf.len()
                )));
            }
            filled += n;
        }
        Ok(())
    }
}

/// Ability to open a logical stream to `host:port` through the tunnel
#[async_trait]
pub trait StreamOpener: Send + Sync {
    async fn open_stream(&self, target: &str) -> Result<Box<dyn TunnelStream>, TunnelError>;
}
