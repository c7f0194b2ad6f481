//! Error taxonomy for the webhook pipeline.
//!
//! - [`EnvelopeError`]: the inbound body is not a usable envelope
//! - [`DecryptionError`]: base64 / block / padding / UTF-8 failures
//! - [`ClassificationError`]: the decrypted plaintext is not a status payload
//! - [`PipelineError`]: union of the three, returned by the ingress pipeline
//! - [`DeliveryError`]: per-subscriber send failure, contained by the hub

use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// Envelope
// ─────────────────────────────────────────────────────────────────────────────

/// The webhook body could not be turned into an encrypted envelope.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    /// Body is not valid JSON, or `dataEncrypt` has the wrong type.
    #[error("invalid webhook body: {0}")]
    InvalidJson(String),
    /// Body parsed but carries no `dataEncrypt` string.
    #[error("missing dataEncrypt in webhook body")]
    MissingCiphertext,
    /// Body could not be read at all, e.g. it exceeds the size limit.
    #[error("unreadable webhook body: {0}")]
    Unreadable(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Decryption
// ─────────────────────────────────────────────────────────────────────────────

/// Failure while decoding or decrypting a ciphertext.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DecryptionError {
    /// Malformed base64, or plaintext that is not UTF-8.
    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),
    /// Ciphertext is empty or not a whole number of cipher blocks.
    #[error("invalid block length: {len} bytes is not a positive multiple of {block_size}")]
    InvalidBlockLength {
        /// Decoded ciphertext length.
        len: usize,
        /// Cipher block size.
        block_size: usize,
    },
    /// Trailing padding byte is zero or longer than the plaintext.
    #[error("invalid padding: length byte {pad} for {len}-byte plaintext")]
    InvalidPadding {
        /// Value of the last decrypted byte.
        pad: u8,
        /// Decrypted length before unpadding.
        len: usize,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Classification
// ─────────────────────────────────────────────────────────────────────────────

/// Failure while interpreting decrypted plaintext as a status payload.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ClassificationError {
    /// Not JSON, not a JSON object, or `status` is not an integer.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    /// `status` is absent or null.
    #[error("Missing status in payload")]
    MissingStatus,
}

// ─────────────────────────────────────────────────────────────────────────────
// Pipeline
// ─────────────────────────────────────────────────────────────────────────────

/// Any failure of the decrypt → classify pipeline.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    /// Envelope stage.
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
    /// Decryption stage.
    #[error(transparent)]
    Decryption(#[from] DecryptionError),
    /// Classification stage.
    #[error(transparent)]
    Classification(#[from] ClassificationError),
}

impl PipelineError {
    /// Short classification string for logging/metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Envelope(EnvelopeError::InvalidJson(_)) => "invalid_body",
            Self::Envelope(EnvelopeError::MissingCiphertext) => "missing_ciphertext",
            Self::Envelope(EnvelopeError::Unreadable(_)) => "unreadable_body",
            Self::Decryption(DecryptionError::InvalidEncoding(_)) => "invalid_encoding",
            Self::Decryption(DecryptionError::InvalidBlockLength { .. }) => "invalid_block_length",
            Self::Decryption(DecryptionError::InvalidPadding { .. }) => "invalid_padding",
            Self::Classification(ClassificationError::MalformedPayload(_)) => "malformed_payload",
            Self::Classification(ClassificationError::MissingStatus) => "missing_status",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Delivery
// ─────────────────────────────────────────────────────────────────────────────

/// A frame could not be queued for one subscriber.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// The subscriber has disconnected.
    #[error("subscriber disconnected")]
    Closed,
    /// The subscriber's send queue is full.
    #[error("subscriber send queue full")]
    Full,
}
