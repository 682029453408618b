//! Length-prefixed padding with decoy injection
//!
//! Padded plaintext layout:
//! ```text
//! +--------+--------+----------------+------------------+
//! | original len (2B BE) | original bytes | padding bytes |
//! +--------+--------+----------------+------------------+
//! ```
//! Padding is random, except that a plausible HTTP-ish decoy string may be
//! embedded at a random offset so the padding itself does not look uniform.

use super::ObfuscationConfig;
use crate::crypto::{random_below, random_bytes};
use crate::tunnel::TunnelError;
use std::borrow::Cow;

/// Size of the original-length prefix
pub const PADDING_HEADER_LEN: usize = 2;

/// Largest payload the 2-byte prefix can describe
pub const MAX_PADDED_PAYLOAD: usize = u16::MAX as usize;

/// Padding must be longer than this before a decoy is embedded
pub const DECOY_MIN_PADDING: usize = 12;

/// Decoy patterns embedded in padding
pub const DECOY_PATTERNS: &[&[u8]] = &[
    b"User-Agent: ",
    b"GET / HTTP/1.1",
    b"POST / HTTP/1.1",
    b"Host: ",
    b"Accept: */*",
    b"Content-Type: application/octet-stream",
    b"Connection: keep-alive",
    b"Cache-Control: no-cache",
];

/// Draw a padding length from `[min_padding, max_padding]`
pub fn padding_len(config: &ObfuscationConfig) -> Result<usize, TunnelError> {
    let span = config.max_padding.saturating_sub(config.min_padding);
    if span == 0 {
        return Ok(config.min_padding);
    }
    Ok(config.min_padding + random_below(span + 1)?)
}

/// Pad `data`, writing into `scratch` when it is large enough
///
/// Falls back to a fresh allocation when `scratch` is too small; the output
/// bytes are the same either way.
pub fn encode_padding_into<'a>(
    data: &[u8],
    config: &ObfuscationConfig,
    scratch: &'a mut [u8],
) -> Result<Cow<'a, [u8]>, TunnelError> {
    if data.len() > MAX_PADDED_PAYLOAD {
        return Err(TunnelError::Framing(format!(
            "payload of {} bytes exceeds padding prefix limit {}",
            data.len(),
            MAX_PADDED_PAYLOAD
        )));
    }

    let pad = padding_len(config)?;
    let total = PADDING_HEADER_LEN + data.len() + pad;

    if total <= scratch.len() {
        let out = &mut scratch[..total];
        write_padded(data, pad, out)?;
        Ok(Cow::Borrowed(&*out))
    } else {
        let mut out = vec![0u8; total];
        write_padded(data, pad, &mut out)?;
        Ok(Cow::Owned(out))
    }
}

/// Pad `data` into a newly allocated buffer
pub fn encode_padding(data: &[u8], config: &ObfuscationConfig) -> Result<Vec<u8>, TunnelError> {
    encode_padding_into(data, config, &mut []).map(Cow::into_owned)
}

/// Strip padding, returning exactly the original bytes
pub fn decode_padding(buf: &[u8]) -> Result<&[u8], TunnelError> {
    if buf.len() < PADDING_HEADER_LEN {
        return Err(TunnelError::Framing(format!(
            "padded payload too short: {} bytes",
            buf.len()
        )));
    }

    let original_len = u16::from_be_bytes([buf[0], buf[1]]) as usize;
    let end = PADDING_HEADER_LEN + original_len;
    if end > buf.len() {
        return Err(TunnelError::Framing(format!(
            "declared length {} exceeds padded payload of {} bytes",
            original_len,
            buf.len() - PADDING_HEADER_LEN
        )));
    }

    Ok(&buf[PADDING_HEADER_LEN..end])
}

fn write_padded(data: &[u8], pad: usize, out: &mut [u8]) -> Result<(), TunnelError> {
    out[..PADDING_HEADER_LEN].copy_from_slice(&(data.len() as u16).to_be_bytes());
    out[PADDING_HEADER_LEN..PADDING_HEADER_LEN + data.len()].copy_from_slice(data);

    if pad == 0 {
        return Ok(());
    }

    let padding = &mut out[PADDING_HEADER_LEN + data.len()..];
    random_bytes(padding)?;

    if pad > DECOY_MIN_PADDING {
        let decoy = DECOY_PATTERNS[random_below(DECOY_PATTERNS.len())?];
        if decoy.len() < pad {
            let offset = random_below(pad - decoy.len() + 1)?;
            padding[offset..offset + decoy.len()].copy_from_slice(decoy);
        }
    }

    Ok(())
}
