//! Per-frame snappy compression
//!
//! A compressed body is one marker byte followed by the data: `0` when the
//! chunk is stored as-is, `1` when it is a raw snappy block. Chunks that do
//! not shrink are stored, so a body is at most one byte longer than its input.

use super::{TunnelError, MAX_FRAME_PAYLOAD};
use std::borrow::Cow;

const MARKER_LEN: usize = 1;
const STORED: u8 = 0;
const SNAPPY: u8 = 1;

/// Largest chunk whose compressed body still fits in one frame payload
pub const MAX_COMPRESSIBLE_CHUNK: usize = MAX_FRAME_PAYLOAD - MARKER_LEN;

/// Compress `data`, writing into `scratch` when it is large enough
pub fn compress_into<'a>(
    data: &[u8],
    scratch: &'a mut [u8],
) -> Result<Cow<'a, [u8]>, TunnelError> {
    if data.len() > MAX_COMPRESSIBLE_CHUNK {
        return Err(TunnelError::Compression(format!(
            "chunk of {} bytes exceeds limit {}",
            data.len(),
            MAX_COMPRESSIBLE_CHUNK
        )));
    }

    let needed = MARKER_LEN + snap::raw::max_compress_len(data.len()).max(data.len());
    if needed <= scratch.len() {
        let n = encode(data, &mut scratch[..needed])?;
        Ok(Cow::Borrowed(&scratch[..n]))
    } else {
        let mut out = vec![0u8; needed];
        let n = encode(data, &mut out)?;
        out.truncate(n);
        Ok(Cow::Owned(out))
    }
}

fn encode(data: &[u8], out: &mut [u8]) -> Result<usize, TunnelError> {
    let n = snap::raw::Encoder::new()
        .compress(data, &mut out[MARKER_LEN..])
        .map_err(|e| TunnelError::Compression(e.to_string()))?;

    if n < data.len() {
        out[0] = SNAPPY;
        Ok(MARKER_LEN + n)
    } else {
        out[0] = STORED;
        out[MARKER_LEN..MARKER_LEN + data.len()].copy_from_slice(data);
        Ok(MARKER_LEN + data.len())
    }
}

/// Undo [`compress_into`]
///
/// Blocks claiming to expand past one frame payload are rejected before
/// anything is allocated.
pub fn decompress(body: &[u8]) -> Result<Cow<'_, [u8]>, TunnelError> {
    let (&marker, rest) = body
        .split_first()
        .ok_or_else(|| TunnelError::Compression("empty compressed body".to_string()))?;

    match marker {
        STORED => Ok(Cow::Borrowed(rest)),
        SNAPPY => {
            let len = snap::raw::decompress_len(rest)
                .map_err(|e| TunnelError::Compression(e.to_string()))?;
            if len > MAX_FRAME_PAYLOAD {
                return Err(TunnelError::Compression(format!(
                    "block expands to {} bytes, limit is {}",
                    len, MAX_FRAME_PAYLOAD
                )));
            }

            snap::raw::Decoder::new()
                .decompress_vec(rest)
                .map(Cow::Owned)
                .map_err(|e| TunnelError::Compression(e.to_string()))
        }
        other => Err(TunnelError::Compression(format!(
            "unknown compression marker {:#04x}",
            other
        ))),
    }
}
