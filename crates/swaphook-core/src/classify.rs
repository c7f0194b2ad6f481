//! Status classification of decrypted webhook payloads.
//!
//! Unknown status codes are not errors: they classify as `"Unknown status"`
//! so that new upstream codes flow through to subscribers untouched. That
//! includes any JSON integer, even one outside the `i64` range.

use serde_json::{Number, Value};

use crate::errors::ClassificationError;
use crate::messages::{BroadcastMessage, MessageKind};

/// Upstream status: job accepted.
pub const STATUS_STARTED: i64 = 1;
/// Upstream status: job running.
pub const STATUS_IN_PROGRESS: i64 = 2;
/// Upstream status: job finished, result URL in the payload.
pub const STATUS_COMPLETED: i64 = 3;
/// Upstream status: job failed.
pub const STATUS_FAILED: i64 = 4;

/// Message for status codes outside the fixed table.
pub const UNKNOWN_STATUS: &str = "Unknown status";

/// Canonical message for a status code.
pub fn status_message(status: i64) -> &'static str {
    match status {
        STATUS_STARTED => "Processing started",
        STATUS_IN_PROGRESS => "Processing in progress",
        STATUS_COMPLETED => "Processing completed",
        STATUS_FAILED => "Processing failed",
        _ => UNKNOWN_STATUS,
    }
}

/// Message type for a status code. Only a failed job is an error.
pub fn status_kind(status: i64) -> MessageKind {
    if status == STATUS_FAILED {
        MessageKind::Error
    } else {
        MessageKind::StatusUpdate
    }
}

/// Parse decrypted plaintext and classify its `status`.
pub fn classify(plaintext: &str) -> Result<BroadcastMessage, ClassificationError> {
    let payload: Value = serde_json::from_str(plaintext)
        .map_err(|e| ClassificationError::MalformedPayload(e.to_string()))?;

    let Some(fields) = payload.as_object() else {
        return Err(ClassificationError::MalformedPayload(
            "payload is not a JSON object".into(),
        ));
    };

    let status = match fields.get("status") {
        None | Some(Value::Null) => return Err(ClassificationError::MissingStatus),
        Some(Value::Number(n)) if n.is_i64() || n.is_u64() => n.clone(),
        Some(value) => {
            return Err(ClassificationError::MalformedPayload(format!(
                "status is not an integer: {value}"
            )));
        }
    };

    let (kind, message) = describe(&status);
    Ok(BroadcastMessage {
        kind,
        status: Some(status),
        message: message.to_owned(),
        data: Some(payload),
    })
}

/// Kind and message for an integer status. Codes beyond `i64` are unknown.
fn describe(status: &Number) -> (MessageKind, &'static str) {
    match status.as_i64() {
        Some(code) => (status_kind(code), status_message(code)),
        None => (MessageKind::StatusUpdate, UNKNOWN_STATUS),
    }
}
