//! Caching proxy subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request (fallback route)
//!     → Dispatcher::prepare (target URL, header filter, cache eligibility)
//!     → Dispatcher::dispatch
//!         eligible GET/HEAD + fresh entry → replay from cache, no upstream call
//!         otherwise                       → spawned upstream fetch
//!             2xx     → filter headers, store if eligible GET, respond
//!             failure → diagnostic.rs (observed status or 502), never stored
//! ```
//!
//! # Design Decisions
//! - Exactly one upstream call per dispatch, zero on a hit
//! - At most one cache write per dispatch; write failures only log
//! - The fetch outlives the client connection so the result can still be stored

pub mod diagnostic;
pub mod dispatcher;

use axum::http::{HeaderMap, Method};
use bytes::Bytes;

use crate::cache::CacheKey;

pub use diagnostic::UpstreamFailure;
pub use dispatcher::Dispatcher;

/// One inbound call, resolved against the upstream. Lives for a single dispatch.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub method: Method,
    pub target_url: String,
    pub forwarded_headers: HeaderMap,
    pub body: Bytes,
    /// Fixed from the path and method when the request is prepared.
    pub cache_eligible: bool,
}

impl ProxyRequest {
    /// Only a GET populates the cache; HEAD is answered from it but never stores.
    pub fn stores_response(&self) -> bool {
        self.cache_eligible && self.method == Method::GET
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey::from_url(&self.target_url)
    }
}
