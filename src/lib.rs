//! Caching mirror for a single upstream status page, with a signed webhook
//! that pulls new code and clears the cache.

pub mod cache;
pub mod config;
pub mod deploy;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod routing;
pub mod security;
pub mod upstream;
pub mod webhook;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
