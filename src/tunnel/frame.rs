//! Frame encoding/decoding for the tunnel protocol
//!
//! Frame format:
//! ```text
//! +--------+--------+--------+--------+
//! |        Payload Length (4B BE)     |
//! +--------+--------+--------+--------+
//! |              Payload              |
//! +--------+--------+--------+--------+
//! ```
//! The payload is `nonce || ciphertext || tag` when encryption is on, or the
//! (possibly padded) plaintext otherwise.

use super::TunnelError;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Frame header size in bytes
pub const FRAME_HEADER_SIZE: usize = 4;

/// Sanity bound on a declared payload length (2 MB)
pub const MAX_FRAME_LEN: usize = 2 * 1024 * 1024;

/// Encode a frame header for a payload of `len` bytes
pub fn encode_header(len: usize) -> Result<[u8; FRAME_HEADER_SIZE], TunnelError> {
    check_len(len)?;
    Ok((len as u32).to_be_bytes())
}

/// Decode and validate a frame header
pub fn decode_header(header: [u8; FRAME_HEADER_SIZE]) -> Result<usize, TunnelError> {
    let len = u32::from_be_bytes(header) as usize;
    check_len(len)?;
    Ok(len)
}

/// Read one frame header
///
/// Returns `Ok(None)` on a clean EOF before the first header byte. EOF part
/// way through the header is a framing error.
pub async fn read_header<R>(reader: &mut R) -> Result<Option<usize>, TunnelError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut header = [0u8; FRAME_HEADER_SIZE];
    let mut filled = 0;

    while filled < FRAME_HEADER_SIZE {
        let n = reader.read(&mut header[filled..]).await?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(TunnelError::Framing(format!(
                "connection closed inside frame header ({} of {} bytes)",
                filled, FRAME_HEADER_SIZE
            )));
        }
        filled += n;
    }

    decode_header(header).map(Some)
}

fn check_len(len: usize) -> Result<(), TunnelError> {
    if len == 0 {
        return Err(TunnelError::Framing("zero-length frame".to_string()));
    }
    if len > MAX_FRAME_LEN {
        return Err(TunnelError::Framing(format!(
            "frame too large: {} > {}",
            len, MAX_FRAME_LEN
        )));
    }
    Ok(())
}
