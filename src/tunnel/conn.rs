//! Encrypted, obfuscated byte stream over a single transport connection
//!
//! Write path: compress -> pad -> seal -> length prefix -> one `write_all`
//! under the write lock -> optional jitter. Read path is the reverse, with any
//! bytes the caller had no room for kept for the next read.

use super::compress::{compress_into, decompress, MAX_COMPRESSIBLE_CHUNK};
use super::frame::{encode_header, read_header, FRAME_HEADER_SIZE};
use super::pool::BufferPool;
use super::{TunnelError, TunnelStream, MAX_FRAME_PAYLOAD};
use crate::config::CompressionMode;
use crate::crypto::{Cipher, CipherKind};
use crate::obfuscation::{
    decode_padding, encode_padding_into, jitter, ObfuscationConfig, MAX_PADDING,
    PADDING_HEADER_LEN,
};
use async_trait::async_trait;
use bytes::{Buf, BytesMut};
use std::borrow::Cow;
use std::sync::Arc;
use tokio::io::{split, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

struct ReadState<S> {
    half: ReadHalf<S>,
    leftover: BytesMut,
}

/// Framed, optionally encrypted and padded connection
///
/// Reads and writes may proceed concurrently from different tasks; writes
/// are serialized so frames never interleave on the wire.
pub struct EncryptedConn<S> {
    reader: Mutex<ReadState<S>>,
    writer: Mutex<WriteHalf<S>>,
    cipher: Option<Arc<Cipher>>,
    obfuscation: ObfuscationConfig,
    compression: CompressionMode,
    pool: BufferPool,
    max_payload: usize,
}

impl<S> std::fmt::Debug for EncryptedConn<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedConn")
            .field("cipher", &self.cipher.as_ref().map(|c| c.kind()))
            .field("obfuscation", &self.obfuscation.enabled)
            .field("compression", &self.compression)
            .field("max_payload", &self.max_payload)
            .finish()
    }
}

impl<S> EncryptedConn<S>
where
    S: AsyncRead + AsyncWrite + Send,
{
    /// Wrap `stream`; `cipher == None` sends length-framed plaintext
    pub fn new(stream: S, cipher: Option<Arc<Cipher>>, obfuscation: ObfuscationConfig) -> Self {
        let (read_half, write_half) = split(stream);

        Self {
            reader: Mutex::new(ReadState {
                half: read_half,
                leftover: BytesMut::new(),
            }),
            writer: Mutex::new(write_half),
            cipher,
            obfuscation,
            compression: CompressionMode::None,
            pool: BufferPool::default(),
            max_payload: MAX_FRAME_PAYLOAD,
        }
    }

    /// Wrap `stream` keyed from a pre-shared key
    ///
    /// An empty key disables encryption.
    pub fn with_psk(
        stream: S,
        psk: &str,
        kind: CipherKind,
        obfuscation: ObfuscationConfig,
    ) -> Result<Self, TunnelError> {
        let cipher = if psk.is_empty() {
            warn!("No pre-shared key configured, frames are sent unencrypted");
            None
        } else {
            Some(Arc::new(Cipher::from_psk(kind, psk)?))
        };

        Ok(Self::new(stream, cipher, obfuscation))
    }

    /// Limit how many bytes one frame carries (clamped to 1..=65535)
    pub fn with_max_payload(mut self, max_payload: usize) -> Self {
        self.max_payload = max_payload.clamp(1, MAX_FRAME_PAYLOAD);
        self
    }

    /// Compress each frame's payload; both peers must agree
    pub fn with_compression(mut self, compression: CompressionMode) -> Self {
        self.compression = compression;
        self
    }

    /// Use a specific buffer pool
    pub fn with_pool(mut self, pool: BufferPool) -> Self {
        self.pool = pool;
        self
    }

    /// Whether frames are sealed
    pub fn is_encrypted(&self) -> bool {
        self.cipher.is_some()
    }

    /// Largest frame payload a peer sharing these settings can send
    ///
    /// Frame payload limit plus the padding cap and AEAD overhead.
    fn max_frame_len(&self) -> usize {
        let mut len = MAX_FRAME_PAYLOAD;
        if self.obfuscation.enabled {
            len += PADDING_HEADER_LEN + MAX_PADDING;
        }
        match &self.cipher {
            Some(cipher) => cipher.sealed_len(len),
            None => len,
        }
    }

    /// Send up to `max_payload` bytes of `data` as one frame
    pub async fn write(&self, data: &[u8]) -> Result<usize, TunnelError> {
        if data.is_empty() {
            return Ok(0);
        }

        let limit = match self.compression {
            CompressionMode::Snappy => self.max_payload.min(MAX_COMPRESSIBLE_CHUNK),
            CompressionMode::None => self.max_payload,
        };
        let chunk = &data[..data.len().min(limit)];

        {
            let mut zbuf = self.pool.acquire();
            let body: Cow<'_, [u8]> = match self.compression {
                CompressionMode::Snappy => compress_into(chunk, &mut zbuf)?,
                CompressionMode::None => Cow::Borrowed(chunk),
            };

            let mut scratch = self.pool.acquire();
            let plaintext: Cow<'_, [u8]> = if self.obfuscation.enabled {
                encode_padding_into(&body, &self.obfuscation, &mut scratch)?
            } else {
                Cow::Borrowed(&*body)
            };

            let payload_len = match &self.cipher {
                Some(cipher) => cipher.sealed_len(plaintext.len()),
                None => plaintext.len(),
            };
            let total = FRAME_HEADER_SIZE + payload_len;

            let mut pooled = self.pool.acquire();
            let mut heap: Vec<u8>;
            let frame: &mut [u8] = if total <= pooled.len() {
                &mut pooled[..total]
            } else {
                heap = vec![0u8; total];
                &mut heap
            };

            frame[..FRAME_HEADER_SIZE].copy_from_slice(&encode_header(payload_len)?);
            match &self.cipher {
                Some(cipher) => cipher.seal_into(&plaintext, &mut frame[FRAME_HEADER_SIZE..])?,
                None => frame[FRAME_HEADER_SIZE..].copy_from_slice(&plaintext),
            }

            let mut writer = self.writer.lock().await;
            writer.write_all(frame).await?;
            writer.flush().await?;
        }

        if self.obfuscation.enabled {
            jitter(&self.obfuscation, chunk.len()).await?;
        }

        Ok(chunk.len())
    }

    /// Read payload bytes from at most one frame
    ///
    /// Returns `Ok(0)` once the peer has closed cleanly.
    pub async fn read(&self, buf: &mut [u8]) -> Result<usize, TunnelError> {
        if buf.is_empty() {
            return Ok(0);
        }

        let mut state = self.reader.lock().await;
        let ReadState { half, leftover } = &mut *state;

        if !leftover.is_empty() {
            let n = buf.len().min(leftover.len());
            buf[..n].copy_from_slice(&leftover[..n]);
            leftover.advance(n);
            return Ok(n);
        }

        loop {
            let len = match read_header(half).await? {
                Some(len) => len,
                None => return Ok(0),
            };
            if len > self.max_frame_len() {
                return Err(TunnelError::Framing(format!(
                    "frame of {} bytes exceeds limit {}",
                    len,
                    self.max_frame_len()
                )));
            }

            let mut pooled = self.pool.acquire();
            let mut heap: Vec<u8>;
            let body: &mut [u8] = if len <= pooled.len() {
                &mut pooled[..len]
            } else {
                heap = vec![0u8; len];
                &mut heap
            };

            half.read_exact(body).await.map_err(|e| {
                if e.kind() == std::io::ErrorKind::UnexpectedEof {
                    TunnelError::Framing(format!("connection closed inside {}-byte frame", len))
                } else {
                    TunnelError::Io(e)
                }
            })?;

            let plaintext: &[u8] = match &self.cipher {
                Some(cipher) => cipher.open_in_place(body).map_err(|_| {
                    warn!("Frame failed authentication, possible tampering");
                    TunnelError::Authentication
                })?,
                None => body,
            };

            let data = if self.obfuscation.enabled {
                decode_padding(plaintext)?
            } else {
                plaintext
            };

            let data: Cow<'_, [u8]> = match self.compression {
                CompressionMode::Snappy if !data.is_empty() => decompress(data)?,
                _ => Cow::Borrowed(data),
            };

            if data.is_empty() {
                debug!("Skipping frame with empty payload");
                continue;
            }

            let n = buf.len().min(data.len());
            buf[..n].copy_from_slice(&data[..n]);
            leftover.extend_from_slice(&data[n..]);
            return Ok(n);
        }
    }

    /// Shut down the write side of the underlying stream
    pub async fn close(&self) -> Result<(), TunnelError> {
        let mut writer = self.writer.lock().await;
        match writer.shutdown().await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Everything needed to wrap a raw connection, shared by both tunnel ends
#[derive(Debug, Clone)]
pub struct TunnelSettings {
    pub cipher: Option<Arc<Cipher>>,
    pub obfuscation: ObfuscationConfig,
    pub compression: CompressionMode,
    /// Bytes per frame
    pub frame_size: usize,
    pub pool: BufferPool,
}

impl TunnelSettings {
    pub fn new(
        cipher: Option<Arc<Cipher>>,
        obfuscation: ObfuscationConfig,
        frame_size: usize,
    ) -> Self {
        Self {
            cipher,
            obfuscation,
            compression: CompressionMode::None,
            frame_size,
            pool: BufferPool::default(),
        }
    }

    pub fn with_compression(mut self, compression: CompressionMode) -> Self {
        self.compression = compression;
        self
    }

    /// Wrap `stream` in an [`EncryptedConn`]
    pub fn wrap<S>(&self, stream: S) -> EncryptedConn<S>
    where
        S: AsyncRead + AsyncWrite + Send,
    {
        EncryptedConn::new(stream, self.cipher.clone(), self.obfuscation.clone())
            .with_max_payload(self.frame_size)
            .with_compression(self.compression)
            .with_pool(self.pool.clone())
    }
}

#[async_trait]
impl<S> TunnelStream for EncryptedConn<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    async fn read(&self, buf: &mut [u8]) -> Result<usize, TunnelError> {
        EncryptedConn::read(self, buf).await
    }

    async fn write(&self, data: &[u8]) -> Result<usize, TunnelError> {
        EncryptedConn::write(self, data).await
    }

    async fn close(&self) -> Result<(), TunnelError> {
        EncryptedConn::close(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{NONCE_LEN, TAG_LEN};
    use std::time::Duration;
    use tokio::io::{duplex, DuplexStream};

    fn cipher(psk: &str) -> Option<Arc<Cipher>> {
        Some(Arc::new(Cipher::from_psk(CipherKind::Aes256Gcm, psk).unwrap()))
    }

    fn padded() -> ObfuscationConfig {
        ObfuscationConfig::default().with_padding(10, 50)
    }

    fn pair(
        cipher: Option<Arc<Cipher>>,
        obfuscation: ObfuscationConfig,
    ) -> (EncryptedConn<DuplexStream>, EncryptedConn<DuplexStream>) {
        let (a, b) = duplex(1 << 20);
        (
            EncryptedConn::new(a, cipher.clone(), obfuscation.clone()),
            EncryptedConn::new(b, cipher, obfuscation),
        )
    }

    /// Read one raw frame off a plain stream
    async fn raw_frame(stream: &mut DuplexStream) -> ([u8; 4], Vec<u8>) {
        let mut header = [0u8; 4];
        stream.read_exact(&mut header).await.unwrap();
        let mut payload = vec![0u8; u32::from_be_bytes(header) as usize];
        stream.read_exact(&mut payload).await.unwrap();
        (header, payload)
    }

    #[tokio::test]
    async fn test_roundtrip_encrypted_padded() {
        let (client, server) = pair(cipher("secret"), padded());

        assert_eq!(client.write(b"hello tunnel").await.unwrap(), 12);

        let mut buf = [0u8; 64];
        let n = server.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"hello tunnel");
    }

    #[tokio::test]
    async fn test_roundtrip_chacha() {
        let chacha = Some(Arc::new(
            Cipher::from_psk(CipherKind::ChaCha20Poly1305, "secret").unwrap(),
        ));
        let (client, server) = pair(chacha, ObfuscationConfig::disabled());

        client.write(b"chacha").await.unwrap();
        let mut buf = [0u8; 16];
        let n = server.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"chacha");
    }

    #[tokio::test]
    async fn test_header_matches_payload() {
        let (a, mut raw) = duplex(1 << 16);
        let conn = EncryptedConn::new(a, cipher("secret"), padded());

        conn.write(b"measure me").await.unwrap();
        let (header, payload) = raw_frame(&mut raw).await;

        assert_eq!(u32::from_be_bytes(header) as usize, payload.len());
        let padding = payload.len() - NONCE_LEN - TAG_LEN - PADDING_HEADER_LEN - 10;
        assert!((10..=50).contains(&padding));
    }

    #[tokio::test]
    async fn test_plain_frame_is_raw_payload() {
        let (a, mut raw) = duplex(1 << 16);
        let conn = EncryptedConn::new(a, None, ObfuscationConfig::disabled());

        conn.write(b"plain").await.unwrap();
        let (header, payload) = raw_frame(&mut raw).await;

        assert_eq!(header, [0, 0, 0, 5]);
        assert_eq!(payload, b"plain");
    }

    #[tokio::test]
    async fn test_empty_write_sends_nothing() {
        let (a, mut raw) = duplex(1 << 16);
        let conn = EncryptedConn::new(a, cipher("secret"), padded());

        assert_eq!(conn.write(&[]).await.unwrap(), 0);
        conn.write(b"x").await.unwrap();

        let (_, payload) = raw_frame(&mut raw).await;
        let opened = Cipher::from_psk(CipherKind::Aes256Gcm, "secret")
            .unwrap()
            .decrypt(&payload)
            .unwrap();
        assert_eq!(decode_padding(&opened).unwrap(), b"x");
    }

    #[tokio::test]
    async fn test_small_reads_drain_leftover() {
        let (client, server) = pair(cipher("secret"), padded());

        client.write(b"abcdefghij").await.unwrap();
        client.write(b"KLM").await.unwrap();

        let mut buf = [0u8; 4];
        let mut chunks = Vec::new();
        for _ in 0..4 {
            let n = server.read(&mut buf).await.unwrap();
            chunks.push(buf[..n].to_vec());
        }

        // Never mixes bytes from two frames
        assert_eq!(
            chunks,
            vec![b"abcd".to_vec(), b"efgh".to_vec(), b"ij".to_vec(), b"KLM".to_vec()]
        );
    }

    #[tokio::test]
    async fn test_large_write_is_chunked() {
        let (client, server) = pair(cipher("secret"), padded());
        let client = client.with_max_payload(16 * 1024);

        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 253) as u8).collect();
        assert_eq!(client.write(&data).await.unwrap(), 16 * 1024);

        let rest = data[16 * 1024..].to_vec();
        let writer = tokio::spawn(async move {
            TunnelStream::write_all(&client, &rest).await.unwrap();
        });

        let mut received = vec![0u8; data.len()];
        TunnelStream::read_exact(&server, &mut received).await.unwrap();
        writer.await.unwrap();
        assert_eq!(received, data);
    }

    #[tokio::test]
    async fn test_tampered_frame_rejected() {
        let (a, mut raw) = duplex(1 << 16);
        let writer = EncryptedConn::new(a, cipher("secret"), padded());
        writer.write(b"integrity").await.unwrap();
        let (header, payload) = raw_frame(&mut raw).await;

        for bit in [0usize, NONCE_LEN * 8 + 3, payload.len() * 8 - 1] {
            let mut tampered = payload.clone();
            tampered[bit / 8] ^= 1 << (bit % 8);

            let (mut inject, b) = duplex(1 << 16);
            let reader = EncryptedConn::new(b, cipher("secret"), padded());
            inject.write_all(&header).await.unwrap();
            inject.write_all(&tampered).await.unwrap();

            let mut buf = [0u8; 64];
            assert!(matches!(
                reader.read(&mut buf).await,
                Err(TunnelError::Authentication)
            ));
        }
    }

    #[tokio::test]
    async fn test_wrong_key_rejected() {
        let (a, b) = duplex(1 << 16);
        let client = EncryptedConn::new(a, cipher("alpha"), padded());
        let server = EncryptedConn::new(b, cipher("bravo"), padded());

        client.write(b"hello").await.unwrap();
        let mut buf = [0u8; 16];
        assert!(matches!(
            server.read(&mut buf).await,
            Err(TunnelError::Authentication)
        ));
    }

    #[tokio::test]
    async fn test_partial_frame_blocks_until_complete() {
        let (mut raw, b) = duplex(1 << 16);
        let reader = Arc::new(EncryptedConn::new(b, None, ObfuscationConfig::disabled()));

        raw.write_all(&[0, 0, 0, 7]).await.unwrap();
        raw.write_all(b"par").await.unwrap();

        let pending = {
            let reader = reader.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 16];
                let n = reader.read(&mut buf).await.unwrap();
                buf[..n].to_vec()
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!pending.is_finished());

        raw.write_all(b"tial").await.unwrap();
        assert_eq!(pending.await.unwrap(), b"partial".to_vec());
    }

    #[tokio::test]
    async fn test_truncated_frame_is_error() {
        let (mut raw, b) = duplex(1 << 16);
        let reader = EncryptedConn::new(b, None, ObfuscationConfig::disabled());

        raw.write_all(&[0, 0, 0, 10]).await.unwrap();
        raw.write_all(b"short").await.unwrap();
        drop(raw);

        let mut buf = [0u8; 16];
        assert!(matches!(
            reader.read(&mut buf).await,
            Err(TunnelError::Framing(_))
        ));
    }

    #[tokio::test]
    async fn test_bad_headers_rejected() {
        for header in [[0u8, 0, 0, 0], [0x7F, 0xFF, 0xFF, 0xFF]] {
            let (mut raw, b) = duplex(64);
            let reader = EncryptedConn::new(b, None, ObfuscationConfig::disabled());
            raw.write_all(&header).await.unwrap();

            let mut buf = [0u8; 16];
            assert!(matches!(
                reader.read(&mut buf).await,
                Err(TunnelError::Framing(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_clean_eof() {
        let (client, server) = pair(cipher("secret"), padded());
        client.close().await.unwrap();

        let mut buf = [0u8; 16];
        assert_eq!(server.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_writers_produce_whole_frames() {
        const WRITERS: usize = 16;
        const SIZE: usize = 3000;

        let (client, server) = pair(cipher("secret"), padded());
        let client = Arc::new(client.with_pool(BufferPool::new(64 * 1024, 0)));

        let tasks: Vec<_> = (0..WRITERS)
            .map(|i| {
                let client = client.clone();
                tokio::spawn(async move {
                    client.write(&[i as u8; SIZE]).await.unwrap();
                })
            })
            .collect();

        let mut seen = [false; WRITERS];
        let mut buf = vec![0u8; 8192];
        for _ in 0..WRITERS {
            let n = server.read(&mut buf).await.unwrap();
            assert_eq!(n, SIZE);
            let tag = buf[0];
            assert!(buf[..n].iter().all(|b| *b == tag));
            seen[tag as usize] = true;
        }

        for task in tasks {
            task.await.unwrap();
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[tokio::test]
    async fn test_with_psk_empty_is_passthrough() {
        let (a, mut raw) = duplex(1 << 16);
        let conn =
            EncryptedConn::with_psk(a, "", CipherKind::Aes256Gcm, ObfuscationConfig::disabled())
                .unwrap();
        assert!(!conn.is_encrypted());

        conn.write(b"clear").await.unwrap();
        let (_, payload) = raw_frame(&mut raw).await;
        assert_eq!(payload, b"clear");
    }

    #[tokio::test]
    async fn test_zero_capacity_pool_roundtrip() {
        let (a, b) = duplex(1 << 20);
        let client = EncryptedConn::new(a, cipher("secret"), padded())
            .with_pool(BufferPool::new(0, 0));
        let server = EncryptedConn::new(b, cipher("secret"), padded())
            .with_pool(BufferPool::new(0, 0));

        // Every buffer falls back to the heap, padding included
        let data: Vec<u8> = (0..60_000u32).map(|i| (i % 241) as u8).collect();
        assert_eq!(client.write(&data).await.unwrap(), data.len());

        let mut received = vec![0u8; data.len()];
        TunnelStream::read_exact(&server, &mut received).await.unwrap();
        assert_eq!(received, data);
    }

    #[tokio::test]
    async fn test_snappy_roundtrip() {
        let (a, b) = duplex(1 << 20);
        let client = EncryptedConn::new(a, cipher("secret"), padded())
            .with_compression(CompressionMode::Snappy)
            .with_pool(BufferPool::new(0, 0));
        let server = EncryptedConn::new(b, cipher("secret"), padded())
            .with_compression(CompressionMode::Snappy);

        let text = b"Accept: */*\r\nConnection: keep-alive\r\n".repeat(500);
        let mut noise = vec![0u8; 5000];
        crate::crypto::random_bytes(&mut noise).unwrap();

        for data in [&text[..], &noise[..], &b"z"[..]] {
            let writer_data = data.to_vec();
            let mut received = vec![0u8; data.len()];
            let (written, read) = tokio::join!(
                TunnelStream::write_all(&client, &writer_data),
                TunnelStream::read_exact(&server, &mut received)
            );
            written.unwrap();
            read.unwrap();
            assert_eq!(received, data);
        }
    }

    #[tokio::test]
    async fn test_snappy_shrinks_compressible_frames() {
        let text = b"GET /index.html HTTP/1.1\r\nHost: example.com\r\n".repeat(300);

        let mut sizes = Vec::new();
        for mode in [CompressionMode::None, CompressionMode::Snappy] {
            let (a, mut raw) = duplex(1 << 20);
            let conn = EncryptedConn::new(a, cipher("secret"), ObfuscationConfig::disabled())
                .with_compression(mode);
            assert_eq!(conn.write(&text).await.unwrap(), text.len());

            let (header, payload) = raw_frame(&mut raw).await;
            assert_eq!(u32::from_be_bytes(header) as usize, payload.len());
            sizes.push(payload.len());
        }

        assert_eq!(sizes[0], text.len() + NONCE_LEN + TAG_LEN);
        assert!(sizes[1] * 4 < sizes[0]);
    }

    #[tokio::test]
    async fn test_compression_caps_chunk_size() {
        let (a, b) = duplex(1 << 20);
        let client = EncryptedConn::new(a, None, ObfuscationConfig::disabled())
            .with_compression(CompressionMode::Snappy);
        let server = EncryptedConn::new(b, None, ObfuscationConfig::disabled())
            .with_compression(CompressionMode::Snappy);

        let data = vec![1u8; MAX_FRAME_PAYLOAD];
        assert_eq!(client.write(&data).await.unwrap(), MAX_COMPRESSIBLE_CHUNK);

        let mut buf = vec![0u8; MAX_FRAME_PAYLOAD];
        assert_eq!(server.read(&mut buf).await.unwrap(), MAX_COMPRESSIBLE_CHUNK);
    }

    #[tokio::test]
    async fn test_oversized_declared_length_rejected() {
        let (mut raw, b) = duplex(64);
        let reader = EncryptedConn::new(b, cipher("secret"), padded());

        // Under the 2 MiB header bound but beyond anything a peer can send;
        // no body follows, so the read must fail on the header alone
        raw.write_all(&(1u32 << 20).to_be_bytes()).await.unwrap();

        let mut buf = [0u8; 16];
        let result = tokio::time::timeout(Duration::from_secs(1), reader.read(&mut buf))
            .await
            .expect("oversized length should fail without waiting for a body");
        assert!(matches!(result, Err(TunnelError::Framing(_))));

        let largest = reader.max_frame_len();
        assert_eq!(
            largest,
            MAX_FRAME_PAYLOAD + PADDING_HEADER_LEN + MAX_PADDING + NONCE_LEN + TAG_LEN
        );
    }
}
