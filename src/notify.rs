//! Applies a [`Decision`] to the remote PR through an injected provider.
//!
//! The provider is the only place the engine touches the outside world, so
//! tests swap in a recording fake and the decision logic stays pure.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::github::GitHubError;
use crate::policy::types::{Decision, PrRef, PrSnapshot, GATE_LABEL, PENDING_LABEL};

/// Label and comment mutations on a pull request. Calls either succeed or
/// fail atomically; there is no partial rollback of a decision.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn remove_label(&self, pr: &PrRef, name: &str) -> Result<(), GitHubError>;
    async fn add_labels(&self, pr: &PrRef, names: &[&str]) -> Result<(), GitHubError>;
    async fn create_comment(&self, pr: &PrRef, body: &str) -> Result<(), GitHubError>;
}

/// Apply a decision to the PR the snapshot was taken from.
///
/// `Warn` consults the snapshot's label set first and is a no-op when the
/// label is already present. That idempotence is what makes re-running the
/// full cascade every poll cycle safe.
pub async fn apply(
    provider: &dyn Provider,
    snapshot: &PrSnapshot,
    decision: &Decision,
) -> Result<(), GitHubError> {
    let pr = &snapshot.pr;
    match decision {
        Decision::None => Ok(()),
        Decision::Unboop { reason, preboop } => {
            info!(owner = %pr.owner, repo = %pr.repo, pr = pr.number, reason = %reason, "unbooping");
            provider.remove_label(pr, GATE_LABEL).await?;
            if *preboop {
                provider.add_labels(pr, &[PENDING_LABEL]).await?;
            } else {
                provider
                    .create_comment(pr, &format!("unbooping: {reason}"))
                    .await?;
            }
            Ok(())
        }
        Decision::Warn { label, message } => {
            if snapshot.has_label(label) {
                debug!(%label, "warning label already present, skipping");
                return Ok(());
            }
            info!(owner = %pr.owner, repo = %pr.repo, pr = pr.number, %label, "warning");
            provider.add_labels(pr, &[label]).await?;
            provider.create_comment(pr, message).await?;
            Ok(())
        }
        Decision::Demote { label, message } => {
            info!(owner = %pr.owner, repo = %pr.repo, pr = pr.number, %label, "demoting");
            provider.remove_label(pr, label).await?;
            provider.create_comment(pr, message).await?;
            Ok(())
        }
    }
}
