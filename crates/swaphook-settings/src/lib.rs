//! # swaphook-settings
//!
//! Layered configuration for the swaphook server.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** ([`SwaphookSettings::default()`])
//! 2. **Settings file** (`~/.swaphook/settings.json`, deep-merged over defaults)
//! 3. **Environment variables** (`SWAPHOOK_*` overrides, highest priority)
//!
//! Decryption [`Credentials`] are separate and environment-only.

#![deny(unsafe_code)]

pub mod credentials;
pub mod errors;
pub mod loader;
pub mod types;

pub use credentials::Credentials;
pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, deep_merge, load_settings, load_settings_from_path, settings_path, validate,
};
pub use types::{LoggingSettings, ServerSettings, SwaphookSettings};
