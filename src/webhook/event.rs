//! Inbound push event and the ways it can be refused.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde::Deserialize;
use thiserror::Error;

use crate::config::ConfigError;

const BRANCH_REF_PREFIX: &str = "refs/heads/";

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Webhook not configured properly - .env file missing")]
    Configuration(#[source] ConfigError),

    #[error("Invalid Request - Missing signature")]
    MissingSignature,

    #[error("Invalid Signature")]
    InvalidSignature,

    #[error("Invalid JSON payload")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Invalid payload format")]
    InvalidPayload,
}

impl WebhookError {
    pub fn status(&self) -> StatusCode {
        match self {
            WebhookError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            WebhookError::MissingSignature
            | WebhookError::InvalidJson(_)
            | WebhookError::InvalidPayload => StatusCode::BAD_REQUEST,
            WebhookError::InvalidSignature => StatusCode::FORBIDDEN,
        }
    }

    /// Metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            WebhookError::Configuration(_) => "configuration",
            WebhookError::MissingSignature => "missing_signature",
            WebhookError::InvalidSignature => "invalid_signature",
            WebhookError::InvalidJson(_) => "invalid_json",
            WebhookError::InvalidPayload => "invalid_payload",
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

/// A delivery as received. Not persisted.
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    pub raw_body: Bytes,
    pub signature_header: Option<String>,
    pub parsed_ref: Option<String>,
}

#[derive(Deserialize)]
struct PushPayload {
    #[serde(rename = "ref")]
    git_ref: Option<serde_json::Value>,
}

impl WebhookEvent {
    pub fn new(raw_body: Bytes, signature_header: Option<String>) -> Self {
        Self {
            raw_body,
            signature_header,
            parsed_ref: None,
        }
    }

    /// Parse the body and remember its `ref`.
    pub fn parse_ref(&mut self) -> Result<&str, WebhookError> {
        let payload: PushPayload =
            serde_json::from_slice(&self.raw_body).map_err(WebhookError::InvalidJson)?;
        match payload.git_ref {
            Some(serde_json::Value::String(git_ref)) => Ok(self.parsed_ref.insert(git_ref).as_str()),
            _ => Err(WebhookError::InvalidPayload),
        }
    }

    /// Branch named by the parsed ref, if it is a branch ref.
    pub fn branch(&self) -> Option<&str> {
        self.parsed_ref
            .as_deref()
            .and_then(|git_ref| git_ref.strip_prefix(BRANCH_REF_PREFIX))
    }
}
