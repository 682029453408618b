//! Key Derivation Functions
//!
//! Stretches the operator-supplied pre-shared key into the AEAD frame key.

use super::{CryptoError, KEY_LEN};
use ring::hkdf::{self, Salt, HKDF_SHA256};

/// Fixed salt for PSK stretching; both peers must agree on it
const PSK_SALT: &[u8] = b"veil_tunnel/psk/v1";

/// Info label for the frame encryption key
const FRAME_KEY_INFO: &[u8] = b"veil_tunnel_frame_key";

/// HKDF-SHA256 key derivation
pub struct Hkdf {
    prk: hkdf::Prk,
}

impl Hkdf {
    /// Create HKDF from a salt and input keying material
    pub fn new(salt: &[u8], ikm: &[u8]) -> Self {
        Self {
            prk: Salt::new(HKDF_SHA256, salt).extract(ikm),
        }
    }

    /// Expand the PRK into `output`
    pub fn expand(&self, info: &[u8], output: &mut [u8]) -> Result<(), CryptoError> {
        let info_refs = [info];
        let okm = self
            .prk
            .expand(&info_refs, HkdfLen(output.len()))
            .map_err(|_| CryptoError::KeyDerivation("HKDF expand failed".to_string()))?;

        okm.fill(output)
            .map_err(|_| CryptoError::KeyDerivation("HKDF fill failed".to_string()))
    }

    /// Derive a 32-byte key
    pub fn expand_key(&self, info: &[u8]) -> Result<[u8; KEY_LEN], CryptoError> {
        let mut key = [0u8; KEY_LEN];
        self.expand(info, &mut key)?;
        Ok(key)
    }
}

struct HkdfLen(usize);

impl hkdf::KeyType for HkdfLen {
    fn len(&self) -> usize {
        self.0
    }
}

/// Derive the frame key from a pre-shared key string
pub fn derive_psk_key(psk: &str) -> Result<[u8; KEY_LEN], CryptoError> {
    if psk.is_empty() {
        return Err(CryptoError::KeyDerivation("empty pre-shared key".to_string()));
    }

    Hkdf::new(PSK_SALT, psk.as_bytes()).expand_key(FRAME_KEY_INFO)
}
