//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → policy.rs (cache eligibility)
//!     → matcher.rs (evaluate the never-cache conditions)
//!     → Return: eligible or real-time
//!
//! Policy Compilation (at startup):
//!     cache.never_cache[]
//!     → Compile substring matchers
//!     → Freeze as immutable CachePolicy
//! ```
//!
//! # Design Decisions
//! - Policy compiled at startup, immutable at runtime
//! - No regex in hot path
//! - Deterministic: same path always yields the same decision

pub mod matcher;
pub mod policy;

pub use policy::CachePolicy;
