//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → cloned into each subsystem at startup
//!
//! On every webhook delivery:
//!     env_file.rs reads the shared secret file
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - The webhook secret is not part of ProxyConfig; it lives in its own file

pub mod env_file;
pub mod loader;
pub mod schema;
pub mod validation;

pub use env_file::{load_env_file, EnvFile};
pub use loader::{load_config, ConfigError};
pub use schema::{
    CacheConfig, DeployConfig, ListenerConfig, LogFormat, ObservabilityConfig, ProxyConfig,
    SecurityConfig, StaticFilesConfig, TimeoutConfig, UpstreamConfig, WebhookConfig,
};
pub use validation::{validate_config, ValidationError};
