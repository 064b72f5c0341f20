//! The gate policy as an ordered list of predicate→decision pairs.
//!
//! The cascade is evaluated top to bottom and the first rule that matches
//! wins, so precedence is exactly the order of [`CASCADE`]. A rule may match
//! and still decide nothing (the RFC exemption), which short-circuits the
//! rest of the list. The `bop` demotion is deliberately not part of the
//! cascade: it has to fire even when an earlier rule claims the primary
//! decision.

use crate::diff::FileClassification;

use super::types::{CiState, Decision, PrSnapshot, ReviewState, Thresholds};
use super::types::{DEPS_LABEL, FAST_TRACK_LABEL, HEFTY_LABEL};

/// Everything a rule is allowed to look at.
pub struct EvalContext<'a> {
    pub snapshot: &'a PrSnapshot,
    pub cost: usize,
    pub files: &'a FileClassification,
    pub thresholds: &'a Thresholds,
}

impl EvalContext<'_> {
    fn is_refactor(&self) -> bool {
        self.snapshot.title_contains("[refactor]")
    }
}

pub struct Rule {
    pub name: &'static str,
    pub check: fn(&EvalContext) -> Option<Decision>,
}

/// The primary cascade, in precedence order.
pub const CASCADE: &[Rule] = &[
    Rule { name: "rfc-exempt", check: rfc_exempt },
    Rule { name: "wip-title", check: wip_title },
    Rule { name: "wip-body", check: wip_body },
    Rule { name: "not-mergeable", check: not_mergeable },
    Rule { name: "already-merged", check: already_merged },
    Rule { name: "ci-not-green", check: ci_not_green },
    Rule { name: "changes-requested", check: changes_requested },
    Rule { name: "approved", check: approved },
    Rule { name: "oversized", check: oversized },
    Rule { name: "getting-hefty", check: getting_hefty },
    Rule { name: "touches-deps", check: touches_deps },
    Rule { name: "fast-track", check: fast_track },
];

/// RFC PRs are exempt from the whole cascade: matched, but nothing to do.
fn rfc_exempt(ctx: &EvalContext) -> Option<Decision> {
    if ctx.snapshot.title_contains("[rfc]") {
        return Some(Decision::None);
    }
    None
}

fn wip_title(ctx: &EvalContext) -> Option<Decision> {
    if ctx.snapshot.title_contains("wip") {
        return Some(Decision::unboop("\"WIP\" is in the title", false));
    }
    None
}

fn wip_body(ctx: &EvalContext) -> Option<Decision> {
    if ctx.snapshot.body_contains("wip") {
        return Some(Decision::unboop("\"WIP\" is in the description", false));
    }
    None
}

/// GitHub's `mergeable` flag flaps while background merge checks run, which
/// produced spurious unboops. The rule stays in the cascade for audit history;
/// the constant keeps it from ever firing.
const NOT_MERGEABLE_ENABLED: bool = false;

fn not_mergeable(ctx: &EvalContext) -> Option<Decision> {
    if NOT_MERGEABLE_ENABLED && ctx.snapshot.mergeable == Some(false) {
        return Some(Decision::unboop("not mergeable", false));
    }
    None
}

fn already_merged(ctx: &EvalContext) -> Option<Decision> {
    if ctx.snapshot.merged {
        return Some(Decision::unboop("already merged", false));
    }
    None
}

fn ci_not_green(ctx: &EvalContext) -> Option<Decision> {
    match ctx.snapshot.ci_state {
        CiState::None | CiState::Success => None,
        CiState::Failure | CiState::Error => {
            Some(Decision::unboop("tests don't pass", false))
        }
        CiState::Pending => Some(Decision::unboop("tests are pending", true)),
        // A state we failed to interpret is our bug, not the author's; say so
        // on the PR instead of hanging silently.
        CiState::Unknown => Some(Decision::unboop(
            "internal policy error: unexpected CI state",
            false,
        )),
    }
}

fn changes_requested(ctx: &EvalContext) -> Option<Decision> {
    if ctx
        .snapshot
        .reviews
        .iter()
        .any(|r| *r == ReviewState::ChangesRequested)
    {
        return Some(Decision::unboop(
            "changes requested. Make sure to address everyone's comments and dismiss any reviews before booping.",
            false,
        ));
    }
    None
}

fn approved(ctx: &EvalContext) -> Option<Decision> {
    if ctx.snapshot.reviews.iter().any(|r| *r == ReviewState::Approved) {
        return Some(Decision::unboop("approved", false));
    }
    None
}

fn oversized(ctx: &EvalContext) -> Option<Decision> {
    if ctx.cost > ctx.thresholds.max_overhead && !ctx.is_refactor() {
        return Some(Decision::unboop(
            "Your PR is too powerful! Try breaking it up into multiple changes.\n\
             If this is a **pure** refactor you can put `[refactor]` in the title.",
            false,
        ));
    }
    None
}

fn getting_hefty(ctx: &EvalContext) -> Option<Decision> {
    if ctx.cost > ctx.thresholds.warn_overhead && !ctx.is_refactor() {
        return Some(Decision::warn(
            HEFTY_LABEL,
            "This PR is getting big.\n\
             To make it easier for others to review you might want to break it up into smaller changes.",
        ));
    }
    None
}

fn touches_deps(ctx: &EvalContext) -> Option<Decision> {
    if !ctx.files.touched_deps {
        return None;
    }
    let mut message = String::from(
        "This PR updates dependency lock files. Before merging, double check:\n\
         - the changelog of everything upgraded\n\
         - that the lock file diff matches the manifest change\n\
         - that nothing unexpected was pulled in",
    );
    if ctx.files.touched_non_deps {
        message.push_str(
            "\n\nIt also changes other code. Consider splitting the dependency bump into its own PR.",
        );
    }
    Some(Decision::warn(DEPS_LABEL, message))
}

fn fast_track(ctx: &EvalContext) -> Option<Decision> {
    if ctx.cost <= ctx.thresholds.bop_threshold {
        return Some(Decision::warn(
            FAST_TRACK_LABEL,
            "This PR is short and easy to review, fast-tracking it.",
        ));
    }
    None
}

/// Label-regression check, independent of the cascade: a PR that was small
/// enough to fast-track can grow past the threshold and must lose its `bop`.
pub fn demote_check(ctx: &EvalContext) -> Option<Decision> {
    if ctx.snapshot.has_label(FAST_TRACK_LABEL) && ctx.cost > ctx.thresholds.bop_threshold {
        return Some(Decision::Demote {
            label: FAST_TRACK_LABEL,
            message: format!(
                "This PR grew past the fast-track limit ({} meaningful added lines), removing `{}`.",
                ctx.cost, FAST_TRACK_LABEL
            ),
        });
    }
    None
}
