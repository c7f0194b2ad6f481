//! # swaphook-core
//!
//! Foundation types shared by every swaphook crate:
//!
//! - **IDs**: [`ids::ConnectionId`] for WebSocket subscribers
//! - **Messages**: [`messages::BroadcastMessage`], the [`messages::ChannelEvent`]
//!   wire frame, and the inbound [`messages::EncryptedEnvelope`]
//! - **Classification**: [`classify::classify`] turns decrypted plaintext into
//!   a broadcast message
//! - **Errors**: the pipeline error taxonomy in [`errors`]
//! - **Logging**: [`logging::init_subscriber`]

#![deny(unsafe_code)]

pub mod classify;
pub mod errors;
pub mod ids;
pub mod logging;
pub mod messages;

pub use classify::classify;
pub use errors::{
    ClassificationError, DecryptionError, DeliveryError, EnvelopeError, PipelineError,
};
pub use ids::ConnectionId;
pub use messages::{BroadcastMessage, Channel, ChannelEvent, EncryptedEnvelope, MessageKind};
