//! Transmission jitter to defeat timing analysis
//!
//! Jitter is applied by the sender after a frame has been written, and only
//! for payloads above [`JITTER_THRESHOLD`]; small control packets are never
//! delayed so interactive latency is not amplified.

use super::ObfuscationConfig;
use crate::crypto::random_below;
use crate::tunnel::TunnelError;
use std::time::Duration;
use tokio::time::sleep;

/// Payloads at or below this size are never delayed
pub const JITTER_THRESHOLD: usize = 128;

/// Pick the delay to inject after sending `payload_len` bytes
///
/// Returns `None` when no delay applies.
pub fn jitter_delay(
    config: &ObfuscationConfig,
    payload_len: usize,
) -> Result<Option<Duration>, TunnelError> {
    if !config.enabled || config.max_delay_ms == 0 || payload_len <= JITTER_THRESHOLD {
        return Ok(None);
    }

    let min = config.min_delay_ms.min(config.max_delay_ms);
    let span = config.max_delay_ms - min;
    let ms = min + random_below(span as usize + 1)? as u64;

    if ms == 0 {
        return Ok(None);
    }
    Ok(Some(Duration::from_millis(ms)))
}

/// Sleep for the jitter delay (if any) applicable to `payload_len`
pub async fn jitter(config: &ObfuscationConfig, payload_len: usize) -> Result<(), TunnelError> {
    if let Some(delay) = jitter_delay(config, payload_len)? {
        sleep(delay).await;
    }
    Ok(())
}
