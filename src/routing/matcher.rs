//! Path matching logic.
//!
//! # Responsibilities
//! - Match a request path against a substring (the real-time class)
//! - Combine conditions with OR semantics
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - Only the path is inspected; the query string never changes a decision
//! - No regex to guarantee O(n) matching

/// Trait for matching request paths against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the path matches this condition.
    fn matches(&self, path: &str) -> bool;
}

/// Matches when the needle occurs anywhere in the path.
#[derive(Debug, Clone)]
pub struct PathContainsMatcher {
    needle: String,
}

impl PathContainsMatcher {
    pub fn new(needle: impl Into<String>) -> Self {
        Self {
            needle: needle.into(),
        }
    }
}

impl Matcher for PathContainsMatcher {
    fn matches(&self, path: &str) -> bool {
        path.contains(&self.needle)
    }
}

/// Combines multiple matchers with OR semantics. Empty never matches.
#[derive(Debug, Default)]
pub struct AnyMatcher {
    matchers: Vec<Box<dyn Matcher>>,
}

impl AnyMatcher {
    pub fn new(matchers: Vec<Box<dyn Matcher>>) -> Self {
        Self { matchers }
    }
}

impl Matcher for AnyMatcher {
    fn matches(&self, path: &str) -> bool {
        self.matchers.iter().any(|m| m.matches(path))
    }
}
