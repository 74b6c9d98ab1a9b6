//! Header forwarding filters.
//!
//! # Responsibilities
//! - Drop connection-scoped and transport-derived headers from client requests
//! - Drop stream-framing headers from upstream responses
//!
//! # Design Decisions
//! - Both filters are pure functions of their input; order is preserved
//! - Values are forwarded opaquely, never re-validated or re-encoded

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

/// Inbound headers the upstream transport re-derives or that only describe
/// the client's own connection.
pub const REQUEST_EXCLUDED: [HeaderName; 5] = [
    header::HOST,
    header::CONNECTION,
    header::ACCEPT_ENCODING,
    header::CONTENT_LENGTH,
    header::TRANSFER_ENCODING,
];

/// Upstream headers describing framing that our own transport recomputes.
pub const RESPONSE_EXCLUDED: [HeaderName; 4] = [
    header::TRANSFER_ENCODING,
    header::CONNECTION,
    header::CONTENT_ENCODING,
    header::CONTENT_LENGTH,
];

/// Headers from the client that may be replayed to the upstream.
pub fn forwardable_request_headers(headers: &HeaderMap) -> HeaderMap {
    let mut forwarded = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if !REQUEST_EXCLUDED.contains(name) {
            forwarded.append(name.clone(), value.clone());
        }
    }
    forwarded
}

/// Upstream response headers to re-emit (and cache), in upstream order.
pub fn forwardable_response_headers(headers: &HeaderMap) -> Vec<(HeaderName, HeaderValue)> {
    headers
        .iter()
        .filter(|(name, _)| !RESPONSE_EXCLUDED.contains(name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}
