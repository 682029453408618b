//! Stream-open header
//!
//! The first bytes on a freshly dialed tunnel connection name the target:
//! ```text
//! +--------+--------+---------------------------+
//! |  Length (2B BE) |  "tcp://host:port"        |
//! +--------+--------+---------------------------+
//! ```

use super::{TunnelError, TunnelStream};

/// Only TCP targets are supported
pub const TARGET_SCHEME: &str = "tcp://";

/// Upper bound on the encoded target
pub const MAX_TARGET_LEN: usize = 4096;

/// Announce `target` (`host:port`) to the far end
pub async fn send_target<T>(stream: &T, target: &str) -> Result<(), TunnelError>
where
    T: TunnelStream + ?Sized,
{
    let len = TARGET_SCHEME.len() + target.len();
    if target.is_empty() || len > MAX_TARGET_LEN {
        return Err(TunnelError::Framing(format!(
            "target length {} out of range",
            len
        )));
    }

    let mut header = Vec::with_capacity(2 + len);
    header.extend_from_slice(&(len as u16).to_be_bytes());
    header.extend_from_slice(TARGET_SCHEME.as_bytes());
    header.extend_from_slice(target.as_bytes());

    stream.write_all(&header).await
}

/// Read the announced target, returning `host:port`
pub async fn recv_target<T>(stream: &T) -> Result<String, TunnelError>
where
    T: TunnelStream + ?Sized,
{
    let mut len_buf = [0u8; 2];
    stream.read_exact(&mut len_buf).await?;

    let len = u16::from_be_bytes(len_buf) as usize;
    if len == 0 || len > MAX_TARGET_LEN {
        return Err(TunnelError::Framing(format!(
            "target length {} out of range",
            len
        )));
    }

    let mut raw = vec![0u8; len];
    stream.read_exact(&mut raw).await?;

    let target = String::from_utf8(raw)
        .map_err(|_| TunnelError::Framing("target is not valid UTF-8".to_string()))?;

    match target.strip_prefix(TARGET_SCHEME) {
        Some(addr) if !addr.is_empty() => Ok(addr.to_string()),
        _ => Err(TunnelError::Framing(format!(
            "unsupported target '{}'",
            target
        ))),
    }
}
