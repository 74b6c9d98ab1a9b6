//! Cached response representation and its on-disk encoding.
//!
//! An entry file looks like a bare HTTP response head followed by the body:
//!
//! ```text
//! 200\r\n
//! content-type: application/json\r\n
//! cache-control: max-age=60\r\n
//! \r\n
//! {"ok":true}
//! ```
//!
//! Header values are written as raw bytes. `HeaderValue` cannot contain CR or
//! LF, so the first blank line always ends the head.

use std::time::SystemTime;

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;

use super::{CacheError, CacheKey};

const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

/// A stored upstream response. Immutable once written.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub status: StatusCode,
    /// Headers that survived the response filter, in upstream order.
    pub headers: Vec<(HeaderName, HeaderValue)>,
    pub body: Bytes,
    pub stored_at: SystemTime,
}

impl CacheEntry {
    pub fn new(
        key: CacheKey,
        status: StatusCode,
        headers: Vec<(HeaderName, HeaderValue)>,
        body: Bytes,
    ) -> Self {
        Self {
            key,
            status,
            headers,
            body,
            stored_at: SystemTime::now(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let head_len: usize = self
            .headers
            .iter()
            .map(|(name, value)| name.as_str().len() + value.as_bytes().len() + 4)
            .sum();
        let mut out = Vec::with_capacity(8 + head_len + 2 + self.body.len());

        out.extend_from_slice(self.status.as_str().as_bytes());
        out.extend_from_slice(b"\r\n");
        for (name, value) in &self.headers {
            out.extend_from_slice(name.as_str().as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(value.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&self.body);
        out
    }

    pub fn decode(key: CacheKey, data: &[u8], stored_at: SystemTime) -> Result<Self, CacheError> {
        let split = data
            .windows(HEAD_TERMINATOR.len())
            .position(|w| w == HEAD_TERMINATOR)
            .ok_or_else(|| CacheError::Corrupt("missing head terminator".into()))?;

        let head = &data[..split];
        let body = Bytes::copy_from_slice(&data[split + HEAD_TERMINATOR.len()..]);

        let mut lines = head.split(|&b| b == b'\n').map(strip_cr);

        let status_line = lines.next().unwrap_or_default();
        let status = StatusCode::from_bytes(status_line)
            .map_err(|_| CacheError::Corrupt("invalid status line".into()))?;

        let mut headers = Vec::new();
        for line in lines {
            let colon = line
                .iter()
                .position(|&b| b == b':')
                .ok_or_else(|| CacheError::Corrupt("header line without ':'".into()))?;
            let name = HeaderName::from_bytes(&line[..colon])
                .map_err(|_| CacheError::Corrupt("invalid header name".into()))?;
            let raw_value = line[colon + 1..].strip_prefix(b" ").unwrap_or(&line[colon + 1..]);
            let value = HeaderValue::from_bytes(raw_value)
                .map_err(|_| CacheError::Corrupt("invalid header value".into()))?;
            headers.push((name, value));
        }

        Ok(Self {
            key,
            status,
            headers,
            body,
            stored_at,
        })
    }
}

fn strip_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

impl IntoResponse for CacheEntry {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        let headers = response.headers_mut();
        for (name, value) in self.headers {
            headers.append(name, value);
        }
        response
    }
}
