//! Cache key derivation.

use std::fmt;

use sha2::{Digest, Sha256};
use url::Url;

/// Content-addressed identifier for a target URL.
///
/// The URL is normalized through [`Url`] (lowercase scheme and host, default
/// port elided) before hashing, so equivalent spellings share an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn from_url(target_url: &str) -> Self {
        let normalized = Url::parse(target_url)
            .map(|url| url.to_string())
            .unwrap_or_else(|_| target_url.to_string());
        let digest = Sha256::digest(normalized.as_bytes());
        Self(hex::encode(digest))
    }

    /// Hex digest, also used as the entry's file name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
