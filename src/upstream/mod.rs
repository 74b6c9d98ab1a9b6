//! Upstream origin subsystem.
//!
//! # Data Flow
//! ```text
//! Proxy dispatcher (method, target URL, filtered headers, body)
//!     → client.rs (one outbound request, redirects followed, TLS verified)
//!     → UpstreamResponse (status, headers, body) or UpstreamError
//! ```
//!
//! # Design Decisions
//! - Single origin, single attempt: no retries, no pooling knobs
//! - Timeout and redirect bound are fixed, not configurable
//! - Non-2xx is a successful fetch here; the dispatcher decides what it means

pub mod client;

use std::error::Error as StdError;
use std::time::Duration;

use axum::http::StatusCode;
use thiserror::Error;

pub use client::{UpstreamClient, UpstreamResponse};

/// Deadline for one upstream exchange, body included.
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(15);

/// Redirect hops followed before giving up.
pub const MAX_REDIRECTS: usize = 10;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("failed to build upstream client: {0}")]
    Client(String),

    #[error("upstream request timed out after {}s", UPSTREAM_TIMEOUT.as_secs())]
    Timeout,

    #[error("too many redirects (limit {MAX_REDIRECTS}): {0}")]
    TooManyRedirects(String),

    #[error("upstream transport error: {0}")]
    Transport(String),

    /// Status line arrived but the body did not.
    #[error("failed reading upstream body: {message}")]
    Body { status: StatusCode, message: String },
}

impl UpstreamError {
    /// HTTP status observed before the failure, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            UpstreamError::Body { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn from_send(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout
        } else if err.is_redirect() {
            UpstreamError::TooManyRedirects(error_chain(&err))
        } else {
            UpstreamError::Transport(error_chain(&err))
        }
    }

    pub(crate) fn from_body(status: StatusCode, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return UpstreamError::Timeout;
        }
        UpstreamError::Body {
            status,
            message: error_chain(&err),
        }
    }
}

/// `reqwest` keeps the interesting part (DNS, TLS, refused) in the source chain.
fn error_chain(err: &dyn StdError) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !out.contains(&text) {
            out.push_str(": ");
            out.push_str(&text);
        }
        source = cause.source();
    }
    out
}
