pub mod rules;
pub mod types;

pub use types::{CiState, Decision, PrRef, PrSnapshot, ReviewState, Thresholds};

use tracing::debug;

use crate::diff::FileClassification;
use rules::EvalContext;

/// Outcome of one evaluation pass: exactly one primary decision, plus an
/// optional demotion that may co-occur with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub primary: Decision,
    pub demote: Option<Decision>,
}

/// Run the demote check and the primary cascade over an enriched snapshot.
/// Pure: no I/O, no shared state, same inputs always give the same outcome.
pub fn evaluate(
    snapshot: &PrSnapshot,
    cost: usize,
    files: &FileClassification,
    thresholds: &Thresholds,
) -> Evaluation {
    let ctx = EvalContext {
        snapshot,
        cost,
        files,
        thresholds,
    };

    let demote = rules::demote_check(&ctx);

    let mut primary = Decision::None;
    for rule in rules::CASCADE {
        if let Some(decision) = (rule.check)(&ctx) {
            debug!(rule = rule.name, cost, "rule matched");
            primary = decision;
            break;
        }
    }

    Evaluation { primary, demote }
}
