//! `POST /api/webhook`.

use std::time::Instant;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use metrics::{counter, histogram};
use serde::Serialize;
use swaphook_core::{EnvelopeError, PipelineError};

use crate::metrics::{WEBHOOK_REQUEST_DURATION_SECONDS, WEBHOOK_REQUESTS_TOTAL};
use crate::pipeline;
use crate::server::AppState;

/// Body of a successful webhook response.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    /// Always `true`.
    pub success: bool,
    /// Fixed acknowledgement text.
    pub message: &'static str,
}

/// Body of a rejected webhook response.
#[derive(Debug, Serialize)]
pub struct WebhookRejection {
    /// Description of the failure.
    pub error: String,
}

/// Decrypt, classify and broadcast one webhook.
///
/// The classified message goes to subscribers only; the caller gets a fixed
/// acknowledgement or a 400 with the failure description. A body that cannot
/// be read (over the size limit) keeps the extractor's status, 413 for the
/// limit, but still gets a JSON error and an error broadcast.
pub async fn webhook_handler(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let started = Instant::now();
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            let status = rejection.status();
            let err = EnvelopeError::Unreadable(rejection.body_text());
            let err = pipeline::reject(err.into(), &state.hub).await;
            return reject_response(status, &err);
        }
    };
    let result = pipeline::ingest(&body, &state.keys, &state.hub).await;
    histogram!(WEBHOOK_REQUEST_DURATION_SECONDS).record(started.elapsed().as_secs_f64());

    match result {
        Ok(_) => {
            counter!(WEBHOOK_REQUESTS_TOTAL, "outcome" => "ok").increment(1);
            let ack = WebhookAck {
                success: true,
                message: "Webhook processed successfully",
            };
            (StatusCode::OK, Json(ack)).into_response()
        }
        Err(err) => reject_response(StatusCode::BAD_REQUEST, &err),
    }
}

fn reject_response(status: StatusCode, err: &PipelineError) -> Response {
    counter!(WEBHOOK_REQUESTS_TOTAL, "outcome" => err.kind()).increment(1);
    let rejection = WebhookRejection {
        error: err.to_string(),
    };
    (status, Json(rejection)).into_response()
}
