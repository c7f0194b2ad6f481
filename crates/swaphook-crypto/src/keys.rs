//! Process-wide key material.

use std::fmt;

use thiserror::Error;

/// Length of the CBC initialization vector.
pub const IV_LEN: usize = 16;

/// Key material could not be built from the configured credentials.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum KeyMaterialError {
    /// AES accepts only 16, 24 or 32 byte keys.
    #[error("invalid key length: {0} bytes (expected 16, 24 or 32)")]
    InvalidKeyLength(usize),
}

/// AES key, sized by variant.
#[derive(Clone)]
pub(crate) enum CipherKey {
    Aes128([u8; 16]),
    Aes192([u8; 24]),
    Aes256([u8; 32]),
}

impl CipherKey {
    fn from_slice(key: &[u8]) -> Result<Self, KeyMaterialError> {
        let invalid = || KeyMaterialError::InvalidKeyLength(key.len());
        match key.len() {
            16 => Ok(Self::Aes128(key.try_into().map_err(|_| invalid())?)),
            24 => Ok(Self::Aes192(key.try_into().map_err(|_| invalid())?)),
            32 => Ok(Self::Aes256(key.try_into().map_err(|_| invalid())?)),
            _ => Err(invalid()),
        }
    }

    fn bits(&self) -> usize {
        match self {
            Self::Aes128(_) => 128,
            Self::Aes192(_) => 192,
            Self::Aes256(_) => 256,
        }
    }
}

/// Derive the 16-byte IV from the IV seed.
///
/// The seed's UTF-8 bytes are truncated to 16 bytes, or right-padded with
/// `0x00` when shorter. This must match the upstream service byte for byte.
pub fn derive_iv(seed: &str) -> [u8; IV_LEN] {
    let mut iv = [0u8; IV_LEN];
    let bytes = seed.as_bytes();
    let n = bytes.len().min(IV_LEN);
    iv[..n].copy_from_slice(&bytes[..n]);
    iv
}

/// AES key plus derived IV. Built once at startup and shared by reference.
#[derive(Clone)]
pub struct DecryptionKeyMaterial {
    pub(crate) key: CipherKey,
    pub(crate) iv: [u8; IV_LEN],
}

impl DecryptionKeyMaterial {
    /// Build key material from raw key bytes and the IV seed.
    pub fn new(key: &[u8], iv_seed: &str) -> Result<Self, KeyMaterialError> {
        Ok(Self {
            key: CipherKey::from_slice(key)?,
            iv: derive_iv(iv_seed),
        })
    }

    /// The derived initialization vector.
    pub fn iv(&self) -> &[u8; IV_LEN] {
        &self.iv
    }

    /// AES key size in bits (128, 192 or 256).
    pub fn key_bits(&self) -> usize {
        self.key.bits()
    }
}

impl fmt::Debug for DecryptionKeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecryptionKeyMaterial")
            .field("key", &format_args!("<{}-bit redacted>", self.key.bits()))
            .field("iv", &self.iv)
            .finish()
    }
}
