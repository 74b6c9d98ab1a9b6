//! Startup orchestration.

use std::sync::Arc;

use thiserror::Error;

use crate::cache::{CacheError, DiskCache};
use crate::config::{validate_config, ProxyConfig, ValidationError};
use crate::deploy::GitCli;
use crate::http::AppState;
use crate::upstream::UpstreamError;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {} error(s)", .0.len())]
    Config(Vec<ValidationError>),

    #[error("cache directory unusable: {0}")]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// Build every subsystem from configuration, in dependency order.
pub async fn assemble(config: &ProxyConfig) -> Result<AppState, StartupError> {
    validate_config(config).map_err(StartupError::Config)?;

    let cache = DiskCache::new(&config.cache.dir);
    cache.init().await?;
    tracing::info!(dir = %cache.dir().display(), "Cache ready");

    let git = GitCli::from_config(&config.deploy);
    tracing::info!(
        repo = %config.deploy.repo_dir.display(),
        remote = %config.deploy.remote,
        branch = %config.deploy.branch,
        "Deployment target"
    );

    let state = AppState::new(config, Arc::new(cache), Arc::new(git))?;
    tracing::info!(upstream = %config.upstream.base_url, "Upstream client ready");
    Ok(state)
}
