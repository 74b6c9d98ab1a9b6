//! Deployment webhook subsystem.
//!
//! # Data Flow
//! ```text
//! POST <webhook.path>
//!     → handler.rs (env file → secret, raw body, signature header)
//!     → deploy::DeploymentTrigger::admit
//!         error    → event.rs WebhookError (400 / 403 / 500)
//!         skipped  → 200 "Branch mismatch"
//!         accepted → fixed-length 200, then detached deploy
//! ```

pub mod event;
pub mod handler;

pub use event::{WebhookError, WebhookEvent};
pub use handler::webhook_handler;
