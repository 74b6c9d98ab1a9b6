//! Per-request cache/upstream decision.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    http::{HeaderMap, Method, Uri},
    response::{IntoResponse, Response},
};
use bytes::Bytes;

use super::{ProxyRequest, UpstreamFailure};
use crate::cache::{CacheEntry, CacheStore};
use crate::observability::metrics::{self, CacheOutcome};
use crate::routing::CachePolicy;
use crate::security::headers::{forwardable_request_headers, forwardable_response_headers};
use crate::upstream::UpstreamClient;

#[derive(Clone)]
pub struct Dispatcher {
    base_url: Arc<str>,
    cache: Arc<dyn CacheStore>,
    upstream: UpstreamClient,
    policy: Arc<CachePolicy>,
}

impl Dispatcher {
    pub fn new(
        base_url: &str,
        cache: Arc<dyn CacheStore>,
        upstream: UpstreamClient,
        policy: CachePolicy,
    ) -> Self {
        Self {
            base_url: Arc::from(base_url.trim_end_matches('/')),
            cache,
            upstream,
            policy: Arc::new(policy),
        }
    }

    /// Upstream base + path, plus `?query` only when the query is non-empty.
    pub fn target_url(&self, path: &str, query: Option<&str>) -> String {
        match query.filter(|q| !q.is_empty()) {
            Some(query) => format!("{}{}?{}", self.base_url, path, query),
            None => format!("{}{}", self.base_url, path),
        }
    }

    pub fn prepare(&self, method: Method, uri: &Uri, headers: &HeaderMap, body: Bytes) -> ProxyRequest {
        ProxyRequest {
            target_url: self.target_url(uri.path(), uri.query()),
            forwarded_headers: forwardable_request_headers(headers),
            body,
            cache_eligible: is_cacheable_method(&method) && self.policy.is_cache_eligible(uri.path()),
            method,
        }
    }

    pub async fn dispatch(&self, request: ProxyRequest) -> Response {
        let start = Instant::now();
        let method = request.method.to_string();

        let outcome = if request.cache_eligible {
            if let Some(entry) = self.cache.get_if_fresh(&request.cache_key()).await {
                tracing::debug!(url = %request.target_url, "Cache hit");
                metrics::record_request(&method, entry.status.as_u16(), CacheOutcome::Hit, start);
                return entry.into_response();
            }
            CacheOutcome::Miss
        } else {
            CacheOutcome::Bypass
        };
        tracing::debug!(url = %request.target_url, outcome = outcome.as_str(), "Fetching upstream");

        // Detached so a client disconnect cannot cancel the fetch or the store.
        let this = self.clone();
        let target_url = request.target_url.clone();
        let (response, outcome) = match tokio::spawn(async move { this.fetch_and_store(request).await }).await {
            Ok(Ok(response)) => (response, outcome),
            Ok(Err(failure)) => (failure.into_response(), CacheOutcome::Error),
            Err(e) => {
                tracing::error!(url = %target_url, error = %e, "Upstream fetch task failed");
                let failure = UpstreamFailure {
                    target_url,
                    error: Some(e.to_string()),
                    status: None,
                    partial_body: Bytes::new(),
                };
                (failure.into_response(), CacheOutcome::Error)
            }
        };

        metrics::record_request(&method, response.status().as_u16(), outcome, start);
        response
    }

    async fn fetch_and_store(&self, request: ProxyRequest) -> Result<Response, UpstreamFailure> {
        let key = request.cache_key();
        let store = request.stores_response();
        let ProxyRequest {
            method,
            target_url,
            forwarded_headers,
            body,
            ..
        } = request;

        let upstream = match self
            .upstream
            .fetch(method, &target_url, forwarded_headers, body)
            .await
        {
            Ok(upstream) => upstream,
            Err(e) => {
                return Err(UpstreamFailure {
                    status: e.status(),
                    error: Some(e.to_string()),
                    target_url,
                    partial_body: Bytes::new(),
                })
            }
        };

        if !upstream.status.is_success() {
            tracing::warn!(url = %target_url, status = upstream.status.as_u16(), "Upstream returned an error status");
            return Err(UpstreamFailure {
                target_url,
                error: None,
                status: Some(upstream.status),
                partial_body: upstream.body,
            });
        }

        let entry = CacheEntry::new(
            key,
            upstream.status,
            forwardable_response_headers(&upstream.headers),
            upstream.body,
        );
        if store {
            if let Err(e) = self.cache.put(&entry).await {
                tracing::warn!(url = %target_url, error = %e, "Failed to store response, serving uncached");
                metrics::record_cache_write_failure();
            }
        }
        Ok(entry.into_response())
    }
}

fn is_cacheable_method(method: &Method) -> bool {
    *method == Method::GET || *method == Method::HEAD
}
