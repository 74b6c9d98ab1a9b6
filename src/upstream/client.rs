//! Outbound HTTP client for the mirrored origin.

use std::time::Instant;

use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use bytes::Bytes;
use reqwest::redirect;

use super::{UpstreamError, MAX_REDIRECTS, UPSTREAM_TIMEOUT};
use crate::config::UpstreamConfig;
use crate::observability::metrics;

/// A complete upstream reply, body buffered.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    user_agent: HeaderValue,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let user_agent = HeaderValue::from_str(&config.user_agent)
            .map_err(|e| UpstreamError::Client(format!("invalid user agent: {e}")))?;

        // Certificate and hostname verification stay at reqwest's defaults.
        let http = reqwest::Client::builder()
            .timeout(UPSTREAM_TIMEOUT)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| UpstreamError::Client(e.to_string()))?;

        Ok(Self { http, user_agent })
    }

    /// Issue exactly one request. `headers` must already be filtered.
    pub async fn fetch(
        &self,
        method: Method,
        url: &str,
        mut headers: HeaderMap,
        body: Bytes,
    ) -> Result<UpstreamResponse, UpstreamError> {
        if !headers.contains_key(header::USER_AGENT) {
            headers.insert(header::USER_AGENT, self.user_agent.clone());
        }

        let mut request = self.http.request(method.clone(), url).headers(headers);
        if !body.is_empty() {
            request = request.body(body);
        }

        let start = Instant::now();
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                metrics::record_upstream(None, start);
                let err = UpstreamError::from_send(e);
                tracing::warn!(method = %method, url, error = %err, "Upstream request failed");
                return Err(err);
            }
        };

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| UpstreamError::from_body(status, e));
        metrics::record_upstream(Some(status.as_u16()), start);

        let body = body?;
        tracing::debug!(
            method = %method,
            url,
            status = status.as_u16(),
            bytes = body.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Upstream responded"
        );
        Ok(UpstreamResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unrepresentable_user_agent() {
        let config = UpstreamConfig {
            user_agent: "bad\nagent".into(),
            ..UpstreamConfig::default()
        };
        assert!(matches!(
            UpstreamClient::new(&config),
            Err(UpstreamError::Client(_))
        ));
    }

    #[tokio::test]
    async fn connection_refused_is_a_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = UpstreamClient::new(&UpstreamConfig::default()).unwrap();
        let err = client
            .fetch(
                Method::GET,
                &format!("http://{addr}/widget.json"),
                HeaderMap::new(),
                Bytes::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::Transport(_)), "{err:?}");
        assert_eq!(err.status(), None);
    }
}
