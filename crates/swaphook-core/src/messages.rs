//! Wire types for the webhook body and the real-time channel.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::errors::EnvelopeError;

/// Greeting sent to a subscriber right after it connects.
pub const GREETING: &str = "Connected to server";

/// Payload of the `GET /test-app` liveness broadcast.
pub const HELLO_WORLD: &str = "Hello, World!";

/// Prefix of the error message broadcast when ingestion fails.
const INGESTION_FAILURE_PREFIX: &str = "Error processing webhook";

// ─────────────────────────────────────────────────────────────────────────────
// Inbound
// ─────────────────────────────────────────────────────────────────────────────

/// Inbound webhook body: `{"dataEncrypt": "<base64>"}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedEnvelope {
    /// Base64 AES-CBC ciphertext.
    #[serde(rename = "dataEncrypt")]
    pub data_encrypt: String,
}

impl EncryptedEnvelope {
    /// Parse a raw request body. Unknown fields are ignored.
    ///
    /// The body must be a JSON object; an absent or null `dataEncrypt` is
    /// reported apart from one of the wrong type.
    pub fn parse(body: &[u8]) -> Result<Self, EnvelopeError> {
        let value: Value =
            serde_json::from_slice(body).map_err(|e| EnvelopeError::InvalidJson(e.to_string()))?;
        let Value::Object(mut fields) = value else {
            return Err(EnvelopeError::InvalidJson(
                "webhook body is not a JSON object".into(),
            ));
        };

        match fields.remove("dataEncrypt") {
            None | Some(Value::Null) => Err(EnvelopeError::MissingCiphertext),
            Some(Value::String(data_encrypt)) => Ok(Self { data_encrypt }),
            Some(other) => Err(EnvelopeError::InvalidJson(format!(
                "dataEncrypt is not a string: {other}"
            ))),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Broadcast payloads
// ─────────────────────────────────────────────────────────────────────────────

/// `type` tag of a [`BroadcastMessage`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Processing failed, or ingestion of a webhook failed.
    Error,
    /// A recognised or unrecognised status code.
    StatusUpdate,
    /// Informational (connection greeting).
    Info,
}

/// Message fanned out to subscribers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BroadcastMessage {
    /// Message type tag.
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Upstream status code, when the message came from a status payload.
    /// Kept as the JSON number it arrived as.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Number>,
    /// Human-readable message.
    pub message: String,
    /// Full decrypted payload, passed through unmodified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl BroadcastMessage {
    /// Informational message with no status or data.
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Info,
            status: None,
            message: message.into(),
            data: None,
        }
    }

    /// Error message with no status or data.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Error,
            status: None,
            message: message.into(),
            data: None,
        }
    }

    /// Error broadcast announcing that a webhook could not be ingested.
    pub fn ingestion_failure(reason: &impl std::fmt::Display) -> Self {
        Self::error(format!("{INGESTION_FAILURE_PREFIX}: {reason}"))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Channel frames
// ─────────────────────────────────────────────────────────────────────────────

/// Named event on the real-time channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Status updates and ingestion errors.
    FaceswapStatus,
    /// Greetings and liveness broadcasts.
    Message,
}

impl Channel {
    /// Event name as sent on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FaceswapStatus => "faceswap_status",
            Self::Message => "message",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One WebSocket text frame: `{"event": "...", "data": {...}}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelEvent {
    /// Event name.
    pub event: Channel,
    /// Event payload.
    pub data: Value,
}

impl ChannelEvent {
    /// Wrap a broadcast message as a `faceswap_status` event.
    pub fn status(message: &BroadcastMessage) -> Self {
        Self {
            event: Channel::FaceswapStatus,
            data: serde_json::to_value(message).unwrap_or(Value::Null),
        }
    }

    /// Arbitrary payload on the `message` event.
    pub fn message(data: Value) -> Self {
        Self {
            event: Channel::Message,
            data,
        }
    }

    /// Greeting sent to a newly connected subscriber.
    pub fn greeting() -> Self {
        let info = BroadcastMessage::info(GREETING);
        Self {
            event: Channel::Message,
            data: serde_json::to_value(info).unwrap_or(Value::Null),
        }
    }

    /// Liveness broadcast triggered by `GET /test-app`.
    pub fn hello_world() -> Self {
        Self::message(serde_json::json!({ "data": HELLO_WORLD }))
    }

    /// Serialize to the wire representation.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn parse_envelope() {
        let env = EncryptedEnvelope::parse(br#"{"dataEncrypt":"abc="}"#).unwrap();
        assert_eq!(env.data_encrypt, "abc=");
    }

    #[test]
    fn parse_envelope_ignores_extra_fields() {
        let env =
            EncryptedEnvelope::parse(br#"{"dataEncrypt":"abc=","signature":"x","timestamp":1}"#)
                .unwrap();
        assert_eq!(env.data_encrypt, "abc=");
    }

    #[test]
    fn parse_envelope_missing_field() {
        let err = EncryptedEnvelope::parse(br#"{"other":1}"#).unwrap_err();
        assert_eq!(err, EnvelopeError::MissingCiphertext);
    }

    #[test]
    fn parse_envelope_null_field() {
        let err = EncryptedEnvelope::parse(br#"{"dataEncrypt":null}"#).unwrap_err();
        assert_eq!(err, EnvelopeError::MissingCiphertext);
    }

    #[test]
    fn parse_envelope_not_json() {
        let err = EncryptedEnvelope::parse(b"dataEncrypt=abc").unwrap_err();
        assert_matches!(err, EnvelopeError::InvalidJson(_));
    }

    #[test]
    fn parse_envelope_wrong_type() {
        let err = EncryptedEnvelope::parse(br#"{"dataEncrypt":42}"#).unwrap_err();
        assert_matches!(err, EnvelopeError::InvalidJson(msg) if msg.contains("not a string"));
    }

    #[test]
    fn parse_envelope_rejects_non_object_bodies() {
        let bodies: [&[u8]; 4] = [br#"["abc="]"#, br#""abc=""#, b"42", b"null"];
        for body in bodies {
            let err = EncryptedEnvelope::parse(body).unwrap_err();
            assert_eq!(
                err,
                EnvelopeError::InvalidJson("webhook body is not a JSON object".into())
            );
        }
    }

    #[test]
    fn info_omits_optional_fields() {
        let value = serde_json::to_value(BroadcastMessage::info("hi")).unwrap();
        assert_eq!(value, json!({"type": "info", "message": "hi"}));
    }

    #[test]
    fn ingestion_failure_message() {
        let msg = BroadcastMessage::ingestion_failure(&"bad base64");
        assert_eq!(msg.kind, MessageKind::Error);
        assert_eq!(msg.message, "Error processing webhook: bad base64");
        assert!(msg.status.is_none());
        assert!(msg.data.is_none());
    }

    #[test]
    fn status_update_serializes_type_tag() {
        let msg = BroadcastMessage {
            kind: MessageKind::StatusUpdate,
            status: Some(3.into()),
            message: "Processing completed".into(),
            data: Some(json!({"status": 3})),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "status_update");
        assert_eq!(value["status"], 3);
        assert_eq!(value["data"]["status"], 3);
    }

    #[test]
    fn greeting_frame() {
        let frame: Value = serde_json::from_str(&ChannelEvent::greeting().to_json().unwrap()).unwrap();
        assert_eq!(
            frame,
            json!({"event": "message", "data": {"type": "info", "message": "Connected to server"}})
        );
    }

    #[test]
    fn hello_world_frame() {
        let frame: Value =
            serde_json::from_str(&ChannelEvent::hello_world().to_json().unwrap()).unwrap();
        assert_eq!(frame, json!({"event": "message", "data": {"data": "Hello, World!"}}));
    }

    #[test]
    fn status_frame_uses_faceswap_status_event() {
        let event = ChannelEvent::status(&BroadcastMessage::error("boom"));
        let frame: Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(frame["event"], "faceswap_status");
        assert_eq!(frame["data"]["type"], "error");
        assert_eq!(frame["data"]["message"], "boom");
    }

    #[test]
    fn channel_names() {
        assert_eq!(Channel::FaceswapStatus.as_str(), "faceswap_status");
        assert_eq!(Channel::Message.to_string(), "message");
    }
}
