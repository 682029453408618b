//! AEAD frame sealing/opening
//!
//! Every frame carries its own random nonce, so a single [`Cipher`] can be
//! shared by any number of writers without nonce coordination.
//!
//! Sealed layout: `nonce (12B) || ciphertext || tag (16B)`.

use super::{generate_nonce, CryptoError, KEY_LEN, NONCE_LEN, TAG_LEN};
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, CHACHA20_POLY1305};
use serde::{Deserialize, Serialize};

/// Supported AEAD algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CipherKind {
    /// AES-256-GCM (hardware accelerated on most servers)
    #[default]
    #[serde(rename = "aes-256-gcm")]
    Aes256Gcm,
    /// ChaCha20-Poly1305 (faster on CPUs without AES instructions)
    #[serde(rename = "chacha20-poly1305")]
    ChaCha20Poly1305,
}

impl CipherKind {
    fn algorithm(self) -> &'static ring::aead::Algorithm {
        match self {
            CipherKind::Aes256Gcm => &AES_256_GCM,
            CipherKind::ChaCha20Poly1305 => &CHACHA20_POLY1305,
        }
    }
}

/// AEAD cipher for sealing/opening frame payloads
pub struct Cipher {
    key: LessSafeKey,
    kind: CipherKind,
}

impl std::fmt::Debug for Cipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cipher").field("kind", &self.kind).finish()
    }
}

impl Cipher {
    /// Create a new cipher from a 32-byte key
    pub fn new(kind: CipherKind, key: &[u8; KEY_LEN]) -> Result<Self, CryptoError> {
        let unbound_key =
            UnboundKey::new(kind.algorithm(), key).map_err(|_| CryptoError::InvalidKeyLength)?;

        Ok(Self {
            key: LessSafeKey::new(unbound_key),
            kind,
        })
    }

    /// Create a cipher keyed from a pre-shared key string
    pub fn from_psk(kind: CipherKind, psk: &str) -> Result<Self, CryptoError> {
        let key = super::derive_psk_key(psk)?;
        Self::new(kind, &key)
    }

    /// Algorithm in use
    pub fn kind(&self) -> CipherKind {
        self.kind
    }

    /// Size of the sealed form of a `plaintext_len`-byte payload
    pub fn sealed_len(&self, plaintext_len: usize) -> usize {
        NONCE_LEN + plaintext_len + TAG_LEN
    }

    /// Seal `plaintext` into `out` as `nonce || ciphertext || tag`
    ///
    /// `out` must be exactly [`sealed_len`](Self::sealed_len) bytes long.
    pub fn seal_into(&self, plaintext: &[u8], out: &mut [u8]) -> Result<(), CryptoError> {
        if out.len() != self.sealed_len(plaintext.len()) {
            return Err(CryptoError::Encryption(format!(
                "output buffer is {} bytes, need {}",
                out.len(),
                self.sealed_len(plaintext.len())
            )));
        }

        let nonce = generate_nonce()?;
        let (nonce_area, rest) = out.split_at_mut(NONCE_LEN);
        nonce_area.copy_from_slice(&nonce);

        let (body, tag_area) = rest.split_at_mut(plaintext.len());
        body.copy_from_slice(plaintext);

        let tag = self
            .key
            .seal_in_place_separate_tag(Nonce::assume_unique_for_key(nonce), Aad::empty(), body)
            .map_err(|_| CryptoError::Encryption("seal failed".to_string()))?;
        tag_area.copy_from_slice(tag.as_ref());

        Ok(())
    }

    /// Open a sealed payload in place, returning the verified plaintext
    ///
    /// Nothing is returned unless the tag verifies.
    pub fn open_in_place<'a>(&self, sealed: &'a mut [u8]) -> Result<&'a mut [u8], CryptoError> {
        if sealed.len() < NONCE_LEN + TAG_LEN {
            return Err(CryptoError::AuthenticationFailed);
        }

        let (nonce, body) = sealed.split_at_mut(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce)
            .map_err(|_| CryptoError::AuthenticationFailed)?;

        self.key
            .open_in_place(nonce, Aad::empty(), body)
            .map_err(|_| CryptoError::AuthenticationFailed)
    }

    /// Encrypt data, returning `nonce || ciphertext || tag`
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut out = vec![0u8; self.sealed_len(plaintext.len())];
        self.seal_into(plaintext, &mut out)?;
        Ok(out)
    }

    /// Decrypt `nonce || ciphertext || tag`, verifying the auth tag
    pub fn decrypt(&self, sealed: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut buffer = sealed.to_vec();
        let plaintext = self.open_in_place(&mut buffer)?;
        Ok(plaintext.to_vec())
    }
}
