//! Operator-facing failure body for upstream errors.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;

/// Bytes of a failed upstream body echoed back.
pub const PARTIAL_BODY_LIMIT: usize = 500;

#[derive(Debug, Clone)]
pub struct UpstreamFailure {
    pub target_url: String,
    /// Transport-level error text, if the exchange broke.
    pub error: Option<String>,
    /// Status the upstream actually sent, if it got that far.
    pub status: Option<StatusCode>,
    pub partial_body: Bytes,
}

impl UpstreamFailure {
    /// Observed upstream status, else 502.
    pub fn response_status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::BAD_GATEWAY)
    }

    pub fn render(&self) -> String {
        let mut text = String::from("Upstream fetch failed\n");
        if let Some(error) = &self.error {
            text.push_str(&format!("Error: {error}\n"));
        }
        if let Some(status) = self.status {
            text.push_str(&format!("HTTP Status: {}\n", status.as_u16()));
        }
        text.push_str(&format!("Target URL: {}\n", self.target_url));
        if !self.partial_body.is_empty() {
            let end = self.partial_body.len().min(PARTIAL_BODY_LIMIT);
            text.push_str(&format!(
                "Partial Response: {}...\n",
                String::from_utf8_lossy(&self.partial_body[..end])
            ));
        }
        text
    }
}

impl IntoResponse for UpstreamFailure {
    fn into_response(self) -> Response {
        (
            self.response_status(),
            [
                (
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("text/plain; charset=utf-8"),
                ),
                (header::CACHE_CONTROL, HeaderValue::from_static("no-store")),
            ],
            self.render(),
        )
            .into_response()
    }
}
