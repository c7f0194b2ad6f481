//! Settings error types.

use swaphook_crypto::KeyMaterialError;
use thiserror::Error;

/// Errors that can occur when loading settings or credentials.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Failed to read the settings file from disk.
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to parse JSON in the settings file.
    #[error("failed to parse settings JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// A required credential was absent or empty.
    #[error("missing credential: {0} is not set")]
    MissingCredential(&'static str),
    /// The client secret is not a usable AES key.
    #[error("invalid client secret: {0}")]
    KeyMaterial(#[from] KeyMaterialError),
    /// A settings file value lies outside its accepted range.
    #[error("{key} = {value} is out of range ({min}..={max})")]
    OutOfRange {
        /// Setting name as written in the file.
        key: &'static str,
        /// Offending value.
        value: String,
        /// Inclusive lower bound.
        min: String,
        /// Inclusive upper bound.
        max: String,
    },
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;
