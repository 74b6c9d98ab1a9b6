//! Deployment subsystem.
//!
//! # Data Flow
//! ```text
//! Verified webhook delivery
//!     → trigger.rs admit (signature, branch check)     [before the ack]
//!     → trigger.rs deploy (pull, clear cache)          [after the ack, detached]
//!         → vcs.rs (VersionControl: current_branch, pull)
//!         → CacheStore::clear_all
//! ```
//!
//! # Design Decisions
//! - The trigger depends on the `VersionControl` port, not on git
//! - Pull failures are logged, never retried; the cache is cleared anyway
//! - Progress is logged under the `deploy` target

pub mod trigger;
pub mod vcs;

pub use trigger::{Admission, DeployState, DeploymentReport, DeploymentTrigger};
pub use vcs::{GitCli, PullOutcome, VcsError, VersionControl};
