//! # swaphook-crypto
//!
//! Decryption of face-swap webhook payloads.
//!
//! The upstream service encrypts each status payload with AES in CBC mode,
//! keyed by the client secret, with an IV derived from the client ID, and
//! base64-encodes the result. [`keys::DecryptionKeyMaterial`] holds the
//! process-wide key/IV pair; [`payload::decrypt`] reverses the construction and
//! [`payload::encrypt`] reproduces it for fixtures and manual testing.

#![deny(unsafe_code)]

pub mod keys;
pub mod payload;

pub use keys::{DecryptionKeyMaterial, IV_LEN, KeyMaterialError, derive_iv};
pub use payload::{BLOCK_SIZE, decrypt, encrypt};
