//! Cache eligibility.
//!
//! A request is cache-eligible unless its path belongs to the real-time
//! class. The decision is made once per request, from the path alone.

use crate::config::CacheConfig;
use crate::routing::matcher::{AnyMatcher, Matcher, PathContainsMatcher};

#[derive(Debug, Default)]
pub struct CachePolicy {
    never_cache: AnyMatcher,
}

impl CachePolicy {
    pub fn new(never_cache: AnyMatcher) -> Self {
        Self { never_cache }
    }

    /// Build from `cache.never_cache` path substrings.
    pub fn from_config(config: &CacheConfig) -> Self {
        let matchers = config
            .never_cache
            .iter()
            .filter(|needle| !needle.is_empty())
            .map(|needle| Box::new(PathContainsMatcher::new(needle.clone())) as Box<dyn Matcher>)
            .collect();
        Self::new(AnyMatcher::new(matchers))
    }

    pub fn is_cache_eligible(&self, path: &str) -> bool {
        !self.never_cache.matches(path)
    }
}
