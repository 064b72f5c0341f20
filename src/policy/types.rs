use std::collections::HashSet;

use serde::Deserialize;

/// Label marking a PR as gate-open, i.e. awaiting evaluation.
pub const GATE_LABEL: &str = "boop";
/// Label marking a PR as blocked on something that may resolve on its own
/// (pending CI); the author can re-gate without changing the PR.
pub const PENDING_LABEL: &str = "preboop";
/// Label marking a PR as small enough to merge freely.
pub const FAST_TRACK_LABEL: &str = "bop";
/// Label warning that a PR is getting large.
pub const HEFTY_LABEL: &str = "hefty";
/// Label warning that a PR touches dependency lock files.
pub const DEPS_LABEL: &str = "deps";

/// Identifies a pull request on the remote.
#[derive(Debug, Clone)]
pub struct PrRef {
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

/// Combined CI state for a PR's head ref, derived from its status list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CiState {
    Success,
    Failure,
    Error,
    Pending,
    /// Statuses exist but the leading one reports a state we don't know.
    Unknown,
    /// No statuses reported at all.
    None,
}

impl CiState {
    /// Derive the combined state from raw status states, newest first.
    /// Any success anywhere counts as green; otherwise the newest status
    /// decides.
    pub fn from_status_states<'a, I>(states: I) -> CiState
    where
        I: IntoIterator<Item = &'a str>,
    {
        let states: Vec<&str> = states.into_iter().collect();
        if states.is_empty() {
            return CiState::None;
        }
        if states.iter().any(|s| *s == "success") {
            return CiState::Success;
        }
        match states[0] {
            "failure" => CiState::Failure,
            "error" => CiState::Error,
            "pending" => CiState::Pending,
            _ => CiState::Unknown,
        }
    }
}

/// Verdict attached to a single PR review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewState {
    Approved,
    ChangesRequested,
    Commented,
    Dismissed,
    Pending,
    #[serde(other)]
    Other,
}

/// Immutable view of a pull request for a single evaluation pass.
/// Constructed fresh each poll cycle, never mutated.
#[derive(Debug, Clone)]
pub struct PrSnapshot {
    pub pr: PrRef,
    pub title: String,
    pub body: String,
    /// Current label names on the PR, membership checks only.
    pub labels: HashSet<String>,
    /// GitHub reports `null` while a background mergeability check runs.
    pub mergeable: Option<bool>,
    pub merged: bool,
    pub ci_state: CiState,
    pub reviews: Vec<ReviewState>,
    pub diff_text: String,
}

impl PrSnapshot {
    pub fn has_label(&self, name: &str) -> bool {
        self.labels.contains(name)
    }

    /// Case-insensitive substring match against the title, used for the
    /// `[rfc]` / `[refactor]` / wip conventions.
    pub fn title_contains(&self, marker: &str) -> bool {
        self.title.to_lowercase().contains(marker)
    }

    pub fn body_contains(&self, marker: &str) -> bool {
        self.body.to_lowercase().contains(marker)
    }
}

/// What the engine decided for one PR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Leave the PR alone.
    None,
    /// Close the gate: remove the `boop` label, then either park the PR under
    /// `preboop` or tell the author why.
    Unboop { reason: String, preboop: bool },
    /// Add a warning label plus comment, skipped if the label is already there.
    Warn { label: &'static str, message: String },
    /// Unconditionally strip a label and comment. Used when a fast-tracked PR
    /// outgrows its `bop` label.
    Demote { label: &'static str, message: String },
}

impl Decision {
    pub fn unboop(reason: impl Into<String>, preboop: bool) -> Decision {
        Decision::Unboop {
            reason: reason.into(),
            preboop,
        }
    }

    pub fn warn(label: &'static str, message: impl Into<String>) -> Decision {
        Decision::Warn {
            label,
            message: message.into(),
        }
    }
}

/// Policy thresholds, in units of diff cost (meaningful added lines).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Cost above which the size warning fires.
    pub warn_overhead: usize,
    /// Cost above which the PR is rejected outright.
    pub max_overhead: usize,
    /// Cost at or below which a PR is fast-tracked, and above which a
    /// fast-tracked PR is demoted.
    pub bop_threshold: usize,
}

impl Default for Thresholds {
    fn default() -> Thresholds {
        Thresholds {
            warn_overhead: 300,
            max_overhead: 3000,
            bop_threshold: 50,
        }
    }
}
