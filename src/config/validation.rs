//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and the upstream URL
//! - Check that enabled features have what they need
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not a socket address")]
    BindAddress(String),

    #[error("upstream.base_url {0:?} must be an absolute http(s) URL with a host")]
    UpstreamUrl(String),

    #[error("webhook.path {0:?} must start with '/'")]
    WebhookPath(String),

    #[error("cache.dir must not be empty")]
    CacheDir,

    #[error("deploy.{0} must not be empty when deploy.pull is enabled")]
    DeployField(&'static str),

    #[error("observability.metrics_address {0:?} is not a socket address")]
    MetricsAddress(String),
}

/// Check a parsed configuration, collecting every problem.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    let upstream_ok = Url::parse(&config.upstream.base_url)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
        .unwrap_or(false);
    if !upstream_ok {
        errors.push(ValidationError::UpstreamUrl(config.upstream.base_url.clone()));
    }

    if !config.webhook.path.starts_with('/') {
        errors.push(ValidationError::WebhookPath(config.webhook.path.clone()));
    }

    if config.cache.dir.as_os_str().is_empty() {
        errors.push(ValidationError::CacheDir);
    }

    if config.deploy.pull {
        if config.deploy.remote.trim().is_empty() {
            errors.push(ValidationError::DeployField("remote"));
        }
        if config.deploy.branch.trim().is_empty() {
            errors.push(ValidationError::DeployField("branch"));
        }
        if config.deploy.git_binary.trim().is_empty() {
            errors.push(ValidationError::DeployField("git_binary"));
        }
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
