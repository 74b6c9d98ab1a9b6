//! Webhook-driven deployment.
//!
//! ```text
//! Idle -> Authenticating -> (Rejected | BranchChecking) -> (Skipped | Pulling)
//!      -> CacheClearing -> Done
//! ```
//!
//! `admit` covers everything up to the acknowledgement; `deploy` runs the
//! stages after it and never fails.

use std::fmt;
use std::sync::Arc;

use super::vcs::{PullOutcome, VersionControl};
use crate::cache::CacheStore;
use crate::config::{DeployConfig, WebhookConfig};
use crate::observability::metrics;
use crate::security::signature;
use crate::webhook::{WebhookError, WebhookEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployState {
    Idle,
    Authenticating,
    Rejected,
    BranchChecking,
    Skipped,
    Pulling,
    CacheClearing,
    Done,
}

impl DeployState {
    pub fn as_str(self) -> &'static str {
        match self {
            DeployState::Idle => "idle",
            DeployState::Authenticating => "authenticating",
            DeployState::Rejected => "rejected",
            DeployState::BranchChecking => "branch_checking",
            DeployState::Skipped => "skipped",
            DeployState::Pulling => "pulling",
            DeployState::CacheClearing => "cache_clearing",
            DeployState::Done => "done",
        }
    }
}

impl fmt::Display for DeployState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the pre-acknowledgement stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Deploy after acknowledging.
    Accepted,
    /// Acknowledge, do nothing else.
    Skipped {
        pushed: Option<String>,
        current: Option<String>,
    },
}

/// What the post-acknowledgement stages did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentReport {
    pub state: DeployState,
    /// `None` when pulling is disabled.
    pub pull: Option<PullOutcome>,
    /// `None` when clearing is disabled or failed.
    pub cleared: Option<usize>,
}

pub struct DeploymentTrigger {
    vcs: Arc<dyn VersionControl>,
    cache: Arc<dyn CacheStore>,
    authenticate: bool,
    branch_check: bool,
    pull: bool,
    clear_cache: bool,
}

fn transition(from: DeployState, to: DeployState) -> DeployState {
    tracing::debug!(target: "deploy", from = %from, to = %to, "Deployment state change");
    to
}

impl DeploymentTrigger {
    pub fn new(
        webhook: &WebhookConfig,
        deploy: &DeployConfig,
        vcs: Arc<dyn VersionControl>,
        cache: Arc<dyn CacheStore>,
    ) -> Self {
        Self {
            vcs,
            cache,
            authenticate: webhook.authenticate,
            branch_check: webhook.branch_check,
            pull: deploy.pull,
            clear_cache: deploy.clear_cache,
        }
    }

    /// Authenticate and branch-check a delivery. Errors are terminal for the
    /// request and leave the repository and cache untouched.
    pub async fn admit(&self, event: &mut WebhookEvent, secret: &str) -> Result<Admission, WebhookError> {
        let mut state = DeployState::Idle;

        if self.authenticate {
            state = transition(state, DeployState::Authenticating);
            let Some(header) = event.signature_header.as_deref() else {
                transition(state, DeployState::Rejected);
                return Err(WebhookError::MissingSignature);
            };
            if !signature::verify(secret.as_bytes(), &event.raw_body, header) {
                transition(state, DeployState::Rejected);
                tracing::warn!(target: "deploy", "Webhook rejected: invalid signature");
                return Err(WebhookError::InvalidSignature);
            }
        }

        if !self.branch_check {
            return Ok(Admission::Accepted);
        }

        state = transition(state, DeployState::BranchChecking);
        event.parse_ref()?;
        let pushed = event.branch().map(str::to_string);
        let current = match self.vcs.current_branch().await {
            Ok(branch) => Some(branch),
            Err(e) => {
                tracing::warn!(target: "deploy", error = %e, "Could not determine current branch");
                None
            }
        };

        if pushed.is_some() && pushed == current {
            Ok(Admission::Accepted)
        } else {
            transition(state, DeployState::Skipped);
            tracing::info!(
                target: "deploy",
                git_ref = event.parsed_ref.as_deref().unwrap_or_default(),
                current = current.as_deref().unwrap_or("unknown"),
                "Branch mismatch, skipping deployment"
            );
            Ok(Admission::Skipped { pushed, current })
        }
    }

    /// Pull, then clear the cache regardless of the pull result.
    pub async fn deploy(&self) -> DeploymentReport {
        let mut state = DeployState::BranchChecking;

        let pull = if self.pull {
            state = transition(state, DeployState::Pulling);
            let outcome = self.vcs.pull().await;
            if outcome.success {
                tracing::info!(target: "deploy", log = %outcome.log, "Pull succeeded");
            } else {
                tracing::error!(target: "deploy", log = %outcome.log, "Pull failed");
            }
            Some(outcome)
        } else {
            None
        };

        let cleared = if self.clear_cache {
            state = transition(state, DeployState::CacheClearing);
            match self.cache.clear_all().await {
                Ok(removed) => {
                    metrics::record_cache_cleared(removed);
                    tracing::info!(target: "deploy", removed, "Cache cleared");
                    Some(removed)
                }
                Err(e) => {
                    tracing::error!(target: "deploy", error = %e, "Cache clear failed");
                    None
                }
            }
        } else {
            None
        };

        let state = transition(state, DeployState::Done);
        let pull_success = pull.as_ref().map(|p| p.success);
        metrics::record_deployment(state.as_str(), pull_success);
        tracing::info!(
            target: "deploy",
            state = %state,
            pull_success = ?pull_success,
            cleared = ?cleared,
            "Deployment finished"
        );

        DeploymentReport { state, pull, cleared }
    }
}
