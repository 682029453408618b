//! Cryptographic primitives for Veil Tunnel
//!
//! This module provides:
//! - AES-256-GCM / ChaCha20-Poly1305 AEAD with random per-frame nonces
//! - HKDF-SHA256 derivation of the frame key from a pre-shared key
//! - Secure random number generation

mod aead;
mod kdf;

pub use aead::{Cipher, CipherKind};
pub use kdf::{derive_psk_key, Hkdf};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use ring::rand::{SecureRandom, SystemRandom};
use thiserror::Error;

/// Length of symmetric key in bytes
pub const KEY_LEN: usize = 32;

/// Length of nonce in bytes
pub const NONCE_LEN: usize = ring::aead::NONCE_LEN;

/// Length of authentication tag in bytes
pub const TAG_LEN: usize = 16;

/// Cryptographic errors
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Invalid key length")]
    InvalidKeyLength,

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("System RNG unavailable")]
    Rng,
}

/// Fill `buf` with cryptographically secure random bytes
pub fn random_bytes(buf: &mut [u8]) -> Result<(), CryptoError> {
    SystemRandom::new().fill(buf).map_err(|_| CryptoError::Rng)
}

/// Generate a random nonce
pub fn generate_nonce() -> Result<[u8; NONCE_LEN], CryptoError> {
    let mut nonce = [0u8; NONCE_LEN];
    random_bytes(&mut nonce)?;
    Ok(nonce)
}

/// Generate a random 256-bit pre-shared key, base64 encoded
pub fn generate_psk() -> Result<String, CryptoError> {
    let mut key = [0u8; KEY_LEN];
    random_bytes(&mut key)?;
    Ok(BASE64.encode(key))
}

/// Uniform random integer in `0..bound` (returns 0 when `bound` is 0)
pub fn random_below(bound: usize) -> Result<usize, CryptoError> {
    if bound <= 1 {
        return Ok(0);
    }

    let bound = bound as u64;
    // Largest multiple of `bound` that fits, to avoid modulo bias
    let zone = u64::MAX - (u64::MAX % bound);

    loop {
        let mut buf = [0u8; 8];
        random_bytes(&mut buf)?;
        let value = u64::from_le_bytes(buf);
        if value < zone {
            return Ok((value % bound) as usize);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_bytes() {
        let mut buf1 = [0u8; 32];
        let mut buf2 = [0u8; 32];
        random_bytes(&mut buf1).unwrap();
        random_bytes(&mut buf2).unwrap();
        assert_ne!(buf1, buf2);
    }

    #[test]
    fn test_generate_psk() {
        let a = generate_psk().unwrap();
        let b = generate_psk().unwrap();
        assert_ne!(a, b);
        assert_eq!(BASE64.decode(&a).unwrap().len(), KEY_LEN);
    }

    #[test]
    fn test_random_below_range() {
        assert_eq!(random_below(0).unwrap(), 0);
        assert_eq!(random_below(1).unwrap(), 0);

        for _ in 0..1000 {
            assert!(random_below(7).unwrap() < 7);
        }
    }

    #[test]
    fn test_random_below_covers_range() {
        let mut seen = [false; 4];
        for _ in 0..1000 {
            seen[random_below(4).unwrap()] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }
}
