//! Diff heuristics: the "mental overhead" cost of a unified diff and the
//! dependency-file classification of its touched paths.
//!
//! Both scanners are pure line-by-line passes over the raw diff text. They
//! never fail: text without the expected markers simply yields cost 0 and an
//! empty file list.

/// Lock files whose presence in a diff marks a dependency bump.
const LOCK_FILES: &[&str] = &["yarn.lock", "package-lock.json", "go.sum", "Cargo.lock"];

/// Declaration files that, together with the lock files, make up the
/// recognized dependency bookkeeping set.
const MANIFEST_FILES: &[&str] = &["package.json", "go.mod", "Cargo.toml"];

/// Whether a diff touches dependency files, and whether it touches anything
/// else. Not mutually exclusive: a bump plus source changes sets both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileClassification {
    pub touched_deps: bool,
    pub touched_non_deps: bool,
}

/// Count the "meaningful" added lines in a unified diff: the review-burden
/// proxy the size rules run on.
///
/// A `+++ ` header switches the current file; added lines in test files
/// (`__tests__` segments, `_test.go` suffix) and generated files
/// (`__generated__` segments) don't count, nor do blank additions. Any line
/// containing `//` is treated as a comment and skipped, even when the `//`
/// sits inside a string literal. That over-counts comments on purpose; the
/// thresholds are calibrated against this exact heuristic.
pub fn cost(diff_text: &str) -> usize {
    let mut current_file = "";
    let mut n = 0;

    for line in diff_text.lines() {
        if let Some(path) = line.strip_prefix("+++ ") {
            current_file = path;
            continue;
        }

        if is_test_file(current_file) || is_generated_file(current_file) {
            continue;
        }

        let added = match line.strip_prefix('+') {
            Some(rest) => rest,
            None => continue,
        };
        if added.is_empty() {
            continue;
        }
        if line.contains("//") {
            continue;
        }

        n += 1;
    }

    n
}

fn is_test_file(path: &str) -> bool {
    path.contains("__tests__") || path.ends_with("_test.go")
}

fn is_generated_file(path: &str) -> bool {
    path.contains("__generated__")
}

/// Extract the `a/`-side path of every `diff --git a/<path> b/<path>` file
/// block header.
pub fn touched_files(diff_text: &str) -> Vec<String> {
    diff_text
        .lines()
        .filter_map(|line| line.strip_prefix("diff --git a/"))
        .map(|rest| match rest.find(" b/") {
            Some(idx) => rest[..idx].to_string(),
            None => rest.to_string(),
        })
        .collect()
}

/// Classify the touched paths by basename against the dependency file sets.
pub fn classify(diff_text: &str) -> FileClassification {
    let mut classification = FileClassification {
        touched_deps: false,
        touched_non_deps: false,
    };

    for path in touched_files(diff_text) {
        let basename = path.rsplit('/').next().unwrap_or(&path);
        if LOCK_FILES.contains(&basename) {
            classification.touched_deps = true;
        }
        if !LOCK_FILES.contains(&basename) && !MANIFEST_FILES.contains(&basename) {
            classification.touched_non_deps = true;
        }
    }

    classification
}
