//! Response cache subsystem.
//!
//! # Data Flow
//! ```text
//! Proxy dispatcher
//!     → key.rs (target URL → CacheKey)
//!     → CacheStore::get_if_fresh (hit → replay entry.rs)
//!     → CacheStore::put after a cacheable upstream success
//!
//! Deployment trigger
//!     → CacheStore::clear_all
//! ```
//!
//! # Design Decisions
//! - Fixed freshness window; stale entries read as absent and are overwritten lazily
//! - Writes are atomic (temp file + rename); last writer wins on a stampede
//! - No size bound or eviction besides TTL-on-read and clear-all

pub mod disk;
pub mod entry;
pub mod key;

use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use thiserror::Error;

pub use disk::DiskCache;
pub use entry::CacheEntry;
pub use key::CacheKey;

/// Freshness window for every entry.
pub const CACHE_TTL: Duration = Duration::from_secs(15 * 60);

/// `now - stored_at < CACHE_TTL`. A timestamp in the future counts as fresh.
pub fn is_fresh(stored_at: SystemTime, now: SystemTime) -> bool {
    now.duration_since(stored_at).unwrap_or_default() < CACHE_TTL
}

/// Errors from cache storage. Caching is best-effort, so callers log these.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt cache entry: {0}")]
    Corrupt(String),
}

/// Key-value store with atomic put and TTL-on-read.
#[async_trait]
pub trait CacheStore: Send + Sync + 'static {
    /// The entry for `key` if it exists and is younger than [`CACHE_TTL`].
    async fn get_if_fresh(&self, key: &CacheKey) -> Option<CacheEntry>;

    /// Replace any prior entry for `entry.key`.
    async fn put(&self, entry: &CacheEntry) -> Result<(), CacheError>;

    /// Remove every entry. Returns how many entries were removed.
    async fn clear_all(&self) -> Result<usize, CacheError>;
}
