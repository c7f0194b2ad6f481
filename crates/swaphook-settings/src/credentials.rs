//! Webhook decryption credentials.
//!
//! Credentials come only from the environment (after `.env` is loaded by the
//! binary), never from the settings file.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use swaphook_crypto::DecryptionKeyMaterial;

use crate::errors::{Result, SettingsError};

/// Variable holding the IV seed.
pub const CLIENT_ID_VAR: &str = "CLIENT_ID";
/// Variable holding the AES key.
pub const CLIENT_SECRET_VAR: &str = "CLIENT_SECRET";

/// Client ID and secret issued by the face-swap service.
#[derive(Clone)]
pub struct Credentials {
    client_id: String,
    client_secret: SecretString,
}

impl Credentials {
    /// Build from explicit values. Absent or empty values are errors.
    pub fn new(client_id: Option<String>, client_secret: Option<String>) -> Result<Self> {
        let client_id = client_id
            .filter(|v| !v.is_empty())
            .ok_or(SettingsError::MissingCredential(CLIENT_ID_VAR))?;
        let client_secret = client_secret
            .filter(|v| !v.is_empty())
            .ok_or(SettingsError::MissingCredential(CLIENT_SECRET_VAR))?;
        Ok(Self {
            client_id,
            client_secret: SecretString::from(client_secret),
        })
    }

    /// Read `CLIENT_ID` and `CLIENT_SECRET` from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::new(
            std::env::var(CLIENT_ID_VAR).ok(),
            std::env::var(CLIENT_SECRET_VAR).ok(),
        )
    }

    /// The IV seed.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Build the AES key and derived IV.
    pub fn key_material(&self) -> Result<DecryptionKeyMaterial> {
        Ok(DecryptionKeyMaterial::new(
            self.client_secret.expose_secret().as_bytes(),
            &self.client_id,
        )?)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}
