//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Proxied request:
//!     → headers.rs (drop connection-scoped request headers)
//!     → upstream
//!     → headers.rs (drop framing headers from the response)
//!
//! Webhook delivery:
//!     → signature.rs (HMAC-SHA256 over the raw body, constant-time compare)
//! ```
//!
//! # Design Decisions
//! - Fail closed: a signature that cannot be parsed never verifies
//! - The shared secret is never logged; digests may be

pub mod headers;
pub mod signature;
