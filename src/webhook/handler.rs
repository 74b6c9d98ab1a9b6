//! `POST <webhook.path>` handler.
//!
//! Phase 1 (this handler): load the secret, admit the delivery, answer.
//! Phase 2 (detached task): pull and clear, once the answer has been handed to the transport.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;

use super::{WebhookError, WebhookEvent};
use crate::config::load_env_file;
use crate::deploy::Admission;
use crate::http::response::acknowledgement_with_handoff;
use crate::http::AppState;
use crate::observability::metrics;
use crate::security::signature::SIGNATURE_HEADER;

pub const ACKNOWLEDGEMENT: &str = "Webhook received. Processing deployment...";
pub const BRANCH_MISMATCH: &str = "Branch mismatch";

pub async fn webhook_handler(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    match receive(&state, &headers, body).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(target: "deploy", error = %e, status = e.status().as_u16(), "Webhook refused");
            metrics::record_webhook(e.kind());
            e.into_response()
        }
    }
}

async fn receive(state: &AppState, headers: &HeaderMap, body: Bytes) -> Result<Response, WebhookError> {
    tracing::info!(target: "deploy", bytes = body.len(), "Webhook received");

    let env = load_env_file(&state.webhook.env_file)
        .await
        .map_err(WebhookError::Configuration)?;
    let secret = env.get(&state.webhook.secret_key).unwrap_or_default();

    let signature_header = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let mut event = WebhookEvent::new(body, signature_header);

    match state.trigger.admit(&mut event, secret).await? {
        Admission::Skipped { .. } => {
            metrics::record_webhook("skipped");
            Ok((StatusCode::OK, BRANCH_MISMATCH).into_response())
        }
        Admission::Accepted => {
            metrics::record_webhook("accepted");
            let (response, handed_off) = acknowledgement_with_handoff(ACKNOWLEDGEMENT);
            let trigger = state.trigger.clone();
            tokio::spawn(async move {
                // Err means the response was dropped unsent; deploy anyway.
                let _ = handed_off.await;
                trigger.deploy().await;
            });
            Ok(response)
        }
    }
}
