//! Traffic obfuscation layer
//!
//! Provides:
//! - Length-prefixed random padding (defeats length fingerprinting)
//! - Decoy byte patterns inside the padding (defeats padding-content analysis)
//! - Transmission jitter on large payloads (defeats timing analysis)
//!
//! Padding is applied *before* encryption by [`EncryptedConn`], so on the wire
//! an observer only sees sealed frames whose sizes no longer track the
//! application's writes.
//!
//! [`EncryptedConn`]: crate::tunnel::EncryptedConn

mod padding;
mod timing;

pub use padding::{
    decode_padding, encode_padding, encode_padding_into, padding_len, DECOY_MIN_PADDING,
    DECOY_PATTERNS, MAX_PADDED_PAYLOAD, PADDING_HEADER_LEN,
};
pub use timing::{jitter, jitter_delay, JITTER_THRESHOLD};

use serde::{Deserialize, Serialize};

/// Upper bound accepted for `max_padding`
pub const MAX_PADDING: usize = 32 * 1024;

/// Configuration for traffic obfuscation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObfuscationConfig {
    /// Enable padding and jitter
    pub enabled: bool,
    /// Minimum padding bytes per frame
    pub min_padding: usize,
    /// Maximum padding bytes per frame
    pub max_padding: usize,
    /// Lower bound for injected jitter (milliseconds)
    pub min_delay_ms: u64,
    /// Upper bound for injected jitter (milliseconds, 0 = no jitter)
    pub max_delay_ms: u64,
}

impl Default for ObfuscationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_padding: 4,
            max_padding: 32,
            min_delay_ms: 0,
            max_delay_ms: 0,
        }
    }
}

impl ObfuscationConfig {
    /// Obfuscation switched off
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            min_padding: 0,
            max_padding: 0,
            min_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    /// Set padding range
    pub fn with_padding(mut self, min_padding: usize, max_padding: usize) -> Self {
        self.min_padding = min_padding;
        self.max_padding = max_padding;
        self
    }

    /// Set jitter range
    pub fn with_delay(mut self, min_delay_ms: u64, max_delay_ms: u64) -> Self {
        self.min_delay_ms = min_delay_ms;
        self.max_delay_ms = max_delay_ms;
        self
    }

    /// Check range invariants
    pub fn validate(&self) -> Result<(), String> {
        if self.min_padding > self.max_padding {
            return Err(format!(
                "min_padding ({}) must not exceed max_padding ({})",
                self.min_padding, self.max_padding
            ));
        }
        if self.max_padding > MAX_PADDING {
            return Err(format!(
                "max_padding ({}) exceeds limit {}",
                self.max_padding, MAX_PADDING
            ));
        }
        if self.min_delay_ms > self.max_delay_ms {
            return Err(format!(
                "min_delay_ms ({}) must not exceed max_delay_ms ({})",
                self.min_delay_ms, self.max_delay_ms
            ));
        }
        Ok(())
    }
}
