//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the mirror.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the status mirror.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// The single origin being mirrored.
    pub upstream: UpstreamConfig,

    /// Response cache settings.
    pub cache: CacheConfig,

    /// Inbound deployment webhook.
    pub webhook: WebhookConfig,

    /// What a verified webhook delivery does.
    pub deploy: DeployConfig,

    /// Optional local files served ahead of the proxy.
    pub static_files: StaticFilesConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream origin configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Scheme and authority of the origin; the inbound path and query are appended.
    pub base_url: String,

    /// User-Agent sent when the client did not supply one.
    pub user_agent: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://larapush.statuspage.io".to_string(),
            user_agent: "StatusProxy/1.0".to_string(),
        }
    }
}

/// Response cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory holding one file per cached target URL.
    pub dir: PathBuf,

    /// Path substrings that are always fetched live.
    pub never_cache: Vec<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./cache"),
            never_cache: vec!["/status.json".to_string()],
        }
    }
}

/// Webhook endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Route the webhook is mounted on (POST only).
    pub path: String,

    /// Key-value file holding the shared secret. Read on every delivery.
    pub env_file: PathBuf,

    /// Name of the secret inside `env_file`.
    pub secret_key: String,

    /// Require a valid `X-Hub-Signature-256`.
    pub authenticate: bool,

    /// Only deploy pushes to the currently checked-out branch.
    pub branch_check: bool,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            path: "/webhook".to_string(),
            env_file: PathBuf::from("./.env"),
            secret_key: "GITHUB_WEBHOOK_SECRET".to_string(),
            authenticate: true,
            branch_check: true,
        }
    }
}

/// Deployment configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DeployConfig {
    /// Working tree that gets pulled.
    pub repo_dir: PathBuf,

    /// Remote to pull from.
    pub remote: String,

    /// Branch to pull.
    pub branch: String,

    /// Run `git pull` after a verified delivery.
    pub pull: bool,

    /// Clear the response cache after the pull stage.
    pub clear_cache: bool,

    /// Git executable (name on PATH or absolute path).
    pub git_binary: String,

    /// Deploy key used through `GIT_SSH_COMMAND`.
    pub ssh_key: Option<PathBuf>,

    /// `HOME` for the git subprocess (the service user often has none).
    pub home: Option<PathBuf>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            repo_dir: PathBuf::from("."),
            remote: "origin".to_string(),
            branch: "main".to_string(),
            pull: true,
            clear_cache: true,
            git_binary: "git".to_string(),
            ssh_key: None,
            home: None,
        }
    }
}

/// Static file shim.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StaticFilesConfig {
    /// When set, existing regular files under this directory bypass the proxy.
    pub dir: Option<PathBuf>,
}

/// Timeout configuration for inbound handling.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// `pretty` or `json`.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum inbound body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}
