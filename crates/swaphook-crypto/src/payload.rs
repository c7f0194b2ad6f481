//! AES-CBC payload decryption and its inverse.
//!
//! Unpadding reads only the final byte as the pad length and drops that many
//! bytes. The remaining pad bytes are not inspected, matching what the
//! upstream service's own reference decryptor accepts.

use ::cbc::cipher::block_padding::{NoPadding, Pkcs7};
use ::cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes::{Aes128, Aes192, Aes256};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use swaphook_core::DecryptionError;

use crate::keys::{CipherKey, DecryptionKeyMaterial};

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// Decode, decrypt and unpad a base64 ciphertext into UTF-8 plaintext.
pub fn decrypt(
    ciphertext_b64: &str,
    keys: &DecryptionKeyMaterial,
) -> Result<String, DecryptionError> {
    let ciphertext = STANDARD
        .decode(ciphertext_b64.trim())
        .map_err(|e| DecryptionError::InvalidEncoding(format!("base64: {e}")))?;

    if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(DecryptionError::InvalidBlockLength {
            len: ciphertext.len(),
            block_size: BLOCK_SIZE,
        });
    }

    let mut plaintext = decrypt_blocks(&ciphertext, keys)?;
    strip_padding(&mut plaintext)?;

    String::from_utf8(plaintext).map_err(|e| DecryptionError::InvalidEncoding(format!("utf-8: {e}")))
}

/// PKCS#7-pad, encrypt and base64-encode `plaintext`.
pub fn encrypt(plaintext: &str, keys: &DecryptionKeyMaterial) -> String {
    STANDARD.encode(encrypt_bytes(plaintext.as_bytes(), keys))
}

/// Raw CBC decryption of whole blocks, no unpadding.
fn decrypt_blocks(
    ciphertext: &[u8],
    keys: &DecryptionKeyMaterial,
) -> Result<Vec<u8>, DecryptionError> {
    let iv = &keys.iv.into();
    let out = match &keys.key {
        CipherKey::Aes128(k) => ::cbc::Decryptor::<Aes128>::new(&(*k).into(), iv)
            .decrypt_padded_vec_mut::<NoPadding>(ciphertext),
        CipherKey::Aes192(k) => ::cbc::Decryptor::<Aes192>::new(&(*k).into(), iv)
            .decrypt_padded_vec_mut::<NoPadding>(ciphertext),
        CipherKey::Aes256(k) => ::cbc::Decryptor::<Aes256>::new(&(*k).into(), iv)
            .decrypt_padded_vec_mut::<NoPadding>(ciphertext),
    };
    out.map_err(|_| DecryptionError::InvalidBlockLength {
        len: ciphertext.len(),
        block_size: BLOCK_SIZE,
    })
}

fn encrypt_bytes(plaintext: &[u8], keys: &DecryptionKeyMaterial) -> Vec<u8> {
    let iv = &keys.iv.into();
    match &keys.key {
        CipherKey::Aes128(k) => ::cbc::Encryptor::<Aes128>::new(&(*k).into(), iv)
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        CipherKey::Aes192(k) => ::cbc::Encryptor::<Aes192>::new(&(*k).into(), iv)
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        CipherKey::Aes256(k) => ::cbc::Encryptor::<Aes256>::new(&(*k).into(), iv)
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
    }
}

fn strip_padding(buf: &mut Vec<u8>) -> Result<(), DecryptionError> {
    let len = buf.len();
    let pad = buf.last().copied().unwrap_or(0);
    if pad == 0 || usize::from(pad) > len {
        return Err(DecryptionError::InvalidPadding { pad, len });
    }
    buf.truncate(len - usize::from(pad));
    Ok(())
}
