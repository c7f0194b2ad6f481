//! Webhook ingestion: envelope → decrypt → classify → broadcast.

use swaphook_core::{BroadcastMessage, ChannelEvent, EncryptedEnvelope, PipelineError, classify};
use swaphook_crypto::DecryptionKeyMaterial;
use tracing::{info, warn};

use crate::websocket::broadcast::{BroadcastHub, BroadcastReport};

/// Turn a raw webhook body into the message to broadcast.
///
/// Pure: no broadcast and no logging.
pub fn process(
    body: &[u8],
    keys: &DecryptionKeyMaterial,
) -> Result<BroadcastMessage, PipelineError> {
    let envelope = EncryptedEnvelope::parse(body)?;
    let plaintext = swaphook_crypto::decrypt(&envelope.data_encrypt, keys)?;
    Ok(classify(&plaintext)?)
}

/// Process a webhook body and broadcast the outcome on `faceswap_status`.
///
/// Success broadcasts the classified message. Failure broadcasts an
/// `"Error processing webhook: ..."` error and then returns the error, so
/// every call results in exactly one broadcast.
pub async fn ingest(
    body: &[u8],
    keys: &DecryptionKeyMaterial,
    hub: &BroadcastHub,
) -> Result<BroadcastReport, PipelineError> {
    match process(body, keys) {
        Ok(message) => {
            let report = hub.broadcast(&ChannelEvent::status(&message)).await;
            info!(
                status = message.status.as_ref().map(tracing::field::display),
                message = %message.message,
                recipients = report.recipients,
                delivered = report.delivered,
                "webhook processed"
            );
            Ok(report)
        }
        Err(err) => Err(reject(err, hub).await),
    }
}

/// Log a failed ingestion and broadcast it as an error on `faceswap_status`.
///
/// Also used for bodies the HTTP layer refuses before the pipeline runs.
pub async fn reject(err: PipelineError, hub: &BroadcastHub) -> PipelineError {
    warn!(kind = err.kind(), error = %err, "webhook rejected");
    let failure = BroadcastMessage::ingestion_failure(&err);
    let _ = hub.broadcast(&ChannelEvent::status(&failure)).await;
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::{Value, json};
    use swaphook_core::{ClassificationError, DecryptionError, EnvelopeError, MessageKind};

    fn keys() -> DecryptionKeyMaterial {
        DecryptionKeyMaterial::new(b"0123456789abcdef", "client-id").unwrap()
    }

    fn body_for(payload: &Value, keys: &DecryptionKeyMaterial) -> Vec<u8> {
        let ct = swaphook_crypto::encrypt(&payload.to_string(), keys);
        json!({ "dataEncrypt": ct }).to_string().into_bytes()
    }

    #[test]
    fn completed_status() {
        let km = keys();
        let payload = json!({"status": 3, "url": "https://cdn.example/result.mp4"});
        let msg = process(&body_for(&payload, &km), &km).unwrap();
        assert_eq!(msg.kind, MessageKind::StatusUpdate);
        assert_eq!(msg.status, Some(3.into()));
        assert_eq!(msg.message, "Processing completed");
        assert_eq!(msg.data, Some(payload));
    }

    #[test]
    fn failed_status_is_error_kind() {
        let km = keys();
        let msg = process(&body_for(&json!({"status": 4}), &km), &km).unwrap();
        assert_eq!(msg.kind, MessageKind::Error);
        assert_eq!(msg.message, "Processing failed");
    }

    #[test]
    fn non_json_body() {
        assert_matches!(
            process(b"dataEncrypt=abc", &keys()),
            Err(PipelineError::Envelope(EnvelopeError::InvalidJson(_)))
        );
    }

    #[test]
    fn missing_ciphertext() {
        let err = process(br#"{"data":"abc"}"#, &keys()).unwrap_err();
        assert_eq!(err, PipelineError::Envelope(EnvelopeError::MissingCiphertext));
        assert_eq!(err.kind(), "missing_ciphertext");
    }

    #[test]
    fn malformed_base64() {
        let err = process(br#"{"dataEncrypt":"%%%"}"#, &keys()).unwrap_err();
        assert_matches!(err, PipelineError::Decryption(DecryptionError::InvalidEncoding(_)));
    }

    #[test]
    fn missing_status() {
        let km = keys();
        let err = process(&body_for(&json!({"url": "x"}), &km), &km).unwrap_err();
        assert_eq!(
            err,
            PipelineError::Classification(ClassificationError::MissingStatus)
        );
        assert_eq!(err.to_string(), "Missing status in payload");
    }

    #[test]
    fn wrong_key_never_yields_the_plaintext() {
        let sender = keys();
        let receiver = DecryptionKeyMaterial::new(b"fedcba9876543210", "client-id").unwrap();
        let payload = json!({"status": 2});
        let result = process(&body_for(&payload, &sender), &receiver);
        assert!(result.map(|m| m.data != Some(payload)).unwrap_or(true));
    }

    #[tokio::test]
    async fn ingest_broadcasts_status() {
        let km = keys();
        let hub = BroadcastHub::default();
        let mut sub = hub.subscribe().await;
        let _ = sub.receiver.recv().await;

        let report = ingest(&body_for(&json!({"status": 1}), &km), &km, &hub)
            .await
            .unwrap();
        assert_eq!(report.delivered, 1);

        let frame: Value = serde_json::from_str(&sub.receiver.recv().await.unwrap()).unwrap();
        assert_eq!(frame["event"], "faceswap_status");
        assert_eq!(frame["data"]["message"], "Processing started");
    }

    #[tokio::test]
    async fn ingest_broadcasts_failure() {
        let hub = BroadcastHub::default();
        let mut sub = hub.subscribe().await;
        let _ = sub.receiver.recv().await;

        let err = ingest(br#"{"dataEncrypt":"AAAA"}"#, &keys(), &hub)
            .await
            .unwrap_err();
        assert_matches!(
            err,
            PipelineError::Decryption(DecryptionError::InvalidBlockLength { len: 3, .. })
        );

        let frame: Value = serde_json::from_str(&sub.receiver.recv().await.unwrap()).unwrap();
        assert_eq!(frame["data"]["type"], "error");
        assert_eq!(
            frame["data"]["message"],
            format!("Error processing webhook: {err}")
        );
        assert!(frame["data"].get("status").is_none());
    }

    #[tokio::test]
    async fn missing_status_also_broadcasts_error() {
        let km = keys();
        let hub = BroadcastHub::default();
        let mut sub = hub.subscribe().await;
        let _ = sub.receiver.recv().await;

        let _ = ingest(&body_for(&json!({"note": 1}), &km), &km, &hub).await;
        let frame: Value = serde_json::from_str(&sub.receiver.recv().await.unwrap()).unwrap();
        assert_eq!(
            frame["data"]["message"],
            "Error processing webhook: Missing status in payload"
        );
    }

    #[tokio::test]
    async fn status_beyond_i64_is_relayed_verbatim() {
        let km = keys();
        let hub = BroadcastHub::default();
        let mut sub = hub.subscribe().await;
        let _ = sub.receiver.recv().await;

        let body = json!({
            "dataEncrypt": swaphook_crypto::encrypt(r#"{"status":18446744073709551615}"#, &km)
        });
        let _ = ingest(body.to_string().as_bytes(), &km, &hub).await.unwrap();

        let frame: Value = serde_json::from_str(&sub.receiver.recv().await.unwrap()).unwrap();
        assert_eq!(frame["data"]["type"], "status_update");
        assert_eq!(frame["data"]["message"], "Unknown status");
        assert_eq!(frame["data"]["status"], json!(u64::MAX));
    }

    #[tokio::test]
    async fn reject_broadcasts_the_error() {
        let hub = BroadcastHub::default();
        let mut sub = hub.subscribe().await;
        let _ = sub.receiver.recv().await;

        let err = reject(EnvelopeError::Unreadable("too big".into()).into(), &hub).await;
        assert_eq!(err.kind(), "unreadable_body");

        let frame: Value = serde_json::from_str(&sub.receiver.recv().await.unwrap()).unwrap();
        assert_eq!(frame["data"]["type"], "error");
        assert_eq!(
            frame["data"]["message"],
            "Error processing webhook: unreadable webhook body: too big"
        );
    }
}
