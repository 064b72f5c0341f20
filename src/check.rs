//! One poll cycle: list the gated PRs, snapshot each, evaluate, apply.
//!
//! A failure in one PR's pipeline is logged and skipped; the rest of the
//! batch still runs. Re-running a cycle against unchanged PRs applies
//! nothing new, so overlapping or repeated cycles are harmless.

use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::Config;
use crate::diff;
use crate::github::{GitHubClient, GitHubError, Issue};
use crate::notify;
use crate::policy;
use crate::policy::types::{CiState, Decision, PrRef, PrSnapshot};

#[derive(Debug, Default)]
pub struct RunSummary {
    pub evaluated: usize,
    pub applied: usize,
    pub failed: usize,
}

/// Run one full check over every open, gated PR.
pub async fn run_once(
    client: &GitHubClient,
    config: &Config,
    dry_run: bool,
) -> Result<RunSummary, GitHubError> {
    info!("running boop check");
    let issues = client.list_gated_issues().await?;

    let mut summary = RunSummary::default();
    for issue in issues {
        let pr = PrRef {
            owner: issue.repository.owner.login.clone(),
            repo: issue.repository.name.clone(),
            number: issue.number,
        };
        let span = info_span!("check", owner = %pr.owner, repo = %pr.repo, pr = pr.number);
        summary.evaluated += 1;
        match check_one(client, config, issue, pr, dry_run)
            .instrument(span)
            .await
        {
            Ok(applied) => summary.applied += applied,
            Err(err) => {
                warn!(error = %err, "skipping pull request after pipeline failure");
                summary.failed += 1;
            }
        }
    }

    info!(
        evaluated = summary.evaluated,
        applied = summary.applied,
        failed = summary.failed,
        "boop check complete"
    );
    Ok(summary)
}

/// Snapshot, enrich, evaluate, and apply for a single PR. Returns how many
/// decisions were actually applied.
async fn check_one(
    client: &GitHubClient,
    config: &Config,
    issue: Issue,
    pr: PrRef,
    dry_run: bool,
) -> Result<usize, GitHubError> {
    let snapshot = fetch_snapshot(client, issue, pr).await?;

    let cost = diff::cost(&snapshot.diff_text);
    let files = diff::classify(&snapshot.diff_text);
    debug!(
        cost,
        touched_deps = files.touched_deps,
        touched_non_deps = files.touched_non_deps,
        ci_state = ?snapshot.ci_state,
        "enriched snapshot"
    );

    let evaluation = policy::evaluate(&snapshot, cost, &files, &config.policy);

    let mut applied = 0;
    if let Some(demote) = &evaluation.demote {
        applied += apply_decision(client, &snapshot, demote, dry_run).await?;
    }
    applied += apply_decision(client, &snapshot, &evaluation.primary, dry_run).await?;
    Ok(applied)
}

async fn apply_decision(
    client: &GitHubClient,
    snapshot: &PrSnapshot,
    decision: &Decision,
    dry_run: bool,
) -> Result<usize, GitHubError> {
    if matches!(decision, Decision::None) {
        return Ok(0);
    }
    if dry_run {
        info!(decision = ?decision, "dry run: not applying");
        return Ok(0);
    }
    notify::apply(client, snapshot, decision).await?;
    Ok(1)
}

/// Assemble the immutable per-PR snapshot from the remote state: pull
/// metadata, reviews, head-ref statuses, and the raw diff.
async fn fetch_snapshot(
    client: &GitHubClient,
    issue: Issue,
    pr: PrRef,
) -> Result<PrSnapshot, GitHubError> {
    let pull = client.get_pull(&pr).await?;
    let reviews = client.list_reviews(&pr).await?;

    // Statuses live on the head repo, which may be a fork. Fall back to the
    // base repo when the fork is gone.
    let (head_owner, head_repo) = match &pull.head.repo {
        Some(repo) => (repo.owner.login.clone(), repo.name.clone()),
        None => (pr.owner.clone(), pr.repo.clone()),
    };
    let statuses = client
        .list_statuses(&head_owner, &head_repo, &pull.head.git_ref)
        .await?;

    let diff_text = client.get_diff(&pr).await?;

    Ok(PrSnapshot {
        pr,
        title: issue.title,
        body: issue.body.unwrap_or_default(),
        labels: issue.labels.into_iter().map(|l| l.name).collect(),
        mergeable: pull.mergeable,
        merged: pull.merged,
        ci_state: CiState::from_status_states(statuses.iter().map(|s| s.state.as_str())),
        reviews: reviews.into_iter().map(|r| r.state).collect(),
        diff_text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn issue_json(number: u64, title: &str, labels: &[&str]) -> serde_json::Value {
        json!({
            "number": number,
            "title": title,
            "body": "",
            "labels": labels.iter().map(|l| json!({"name": l})).collect::<Vec<_>>(),
            "repository": {"name": "widgets", "owner": {"login": "octo"}}
        })
    }

    /// A diff with `lines` meaningful added lines in one source file.
    fn diff_with_cost(lines: usize) -> String {
        let mut diff = String::from(
            "diff --git a/src/big.rs b/src/big.rs\n--- a/src/big.rs\n+++ b/src/big.rs\n",
        );
        for i in 0..lines {
            diff.push_str(&format!("+let x{} = {};\n", i, i));
        }
        diff
    }

    async fn mount_issue_list(server: &MockServer, issues: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/issues"))
            .and(query_param("labels", "boop"))
            .and(query_param("state", "open"))
            .respond_with(ResponseTemplate::new(200).set_body_json(issues))
            .mount(server)
            .await;
    }

    /// Mount the full fetch sequence for one PR. The diff mock has to go
    /// first: it shares its path with the metadata endpoint and only differs
    /// by the Accept header.
    async fn mount_pr(
        server: &MockServer,
        number: u64,
        statuses: serde_json::Value,
        reviews: serde_json::Value,
        diff: &str,
    ) {
        Mock::given(method("GET"))
            .and(path(format!("/repos/octo/widgets/pulls/{number}")))
            .and(header("accept", "application/vnd.github.diff"))
            .respond_with(ResponseTemplate::new(200).set_body_string(diff.to_string()))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/repos/octo/widgets/pulls/{number}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "merged": false,
                "mergeable": true,
                "head": {"ref": "feature", "repo": {"name": "widgets", "owner": {"login": "octo"}}}
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/repos/octo/widgets/pulls/{number}/reviews")))
            .respond_with(ResponseTemplate::new(200).set_body_json(reviews))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/commits/feature/statuses"))
            .respond_with(ResponseTemplate::new(200).set_body_json(statuses))
            .mount(server)
            .await;
    }

    fn client_for(server: &MockServer) -> GitHubClient {
        GitHubClient::new("test-token".to_string(), server.uri())
    }

    #[tokio::test]
    async fn test_cycle_warns_on_hefty_pr() {
        let server = MockServer::start().await;
        mount_issue_list(&server, json!([issue_json(7, "add caching", &["boop"])])).await;
        mount_pr(
            &server,
            7,
            json!([{"state": "success"}]),
            json!([]),
            &diff_with_cost(400),
        )
        .await;
        Mock::given(method("POST"))
            .and(path("/repos/octo/widgets/issues/7/labels"))
            .and(body_json(json!({"labels": ["hefty"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/repos/octo/widgets/issues/7/comments"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let summary = run_once(&client_for(&server), &Config::default(), false)
            .await
            .unwrap();
        assert_eq!(summary.evaluated, 1);
        assert_eq!(summary.applied, 1);
        assert_eq!(summary.failed, 0);
    }

    #[tokio::test]
    async fn test_cycle_fast_tracks_small_pr() {
        let server = MockServer::start().await;
        mount_issue_list(&server, json!([issue_json(7, "tiny fix", &["boop"])])).await;
        mount_pr(
            &server,
            7,
            json!([{"state": "success"}]),
            json!([]),
            &diff_with_cost(10),
        )
        .await;
        Mock::given(method("POST"))
            .and(path("/repos/octo/widgets/issues/7/labels"))
            .and(body_json(json!({"labels": ["bop"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/repos/octo/widgets/issues/7/comments"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let summary = run_once(&client_for(&server), &Config::default(), false)
            .await
            .unwrap();
        assert_eq!(summary.applied, 1);
    }

    #[tokio::test]
    async fn test_cycle_unboops_on_failing_ci() {
        let server = MockServer::start().await;
        mount_issue_list(&server, json!([issue_json(7, "add caching", &["boop"])])).await;
        mount_pr(
            &server,
            7,
            json!([{"state": "failure"}]),
            json!([]),
            &diff_with_cost(10),
        )
        .await;
        Mock::given(method("DELETE"))
            .and(path("/repos/octo/widgets/issues/7/labels/boop"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/repos/octo/widgets/issues/7/comments"))
            .and(body_json(json!({"body": "unbooping: tests don't pass"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/repos/octo/widgets/issues/7/labels"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let summary = run_once(&client_for(&server), &Config::default(), false)
            .await
            .unwrap();
        assert_eq!(summary.applied, 1);
    }

    #[tokio::test]
    async fn test_cycle_skips_already_warned_pr() {
        let server = MockServer::start().await;
        mount_issue_list(
            &server,
            json!([issue_json(7, "add caching", &["boop", "hefty"])]),
        )
        .await;
        mount_pr(
            &server,
            7,
            json!([{"state": "success"}]),
            json!([]),
            &diff_with_cost(400),
        )
        .await;
        Mock::given(method("POST"))
            .and(path("/repos/octo/widgets/issues/7/labels"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/repos/octo/widgets/issues/7/comments"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
            .expect(0)
            .mount(&server)
            .await;

        let summary = run_once(&client_for(&server), &Config::default(), false)
            .await
            .unwrap();
        assert_eq!(summary.failed, 0);
    }

    #[tokio::test]
    async fn test_cycle_demotes_and_warns_in_same_pass() {
        let server = MockServer::start().await;
        mount_issue_list(
            &server,
            json!([issue_json(7, "grew a lot", &["boop", "bop"])]),
        )
        .await;
        mount_pr(
            &server,
            7,
            json!([{"state": "success"}]),
            json!([]),
            &diff_with_cost(400),
        )
        .await;
        Mock::given(method("DELETE"))
            .and(path("/repos/octo/widgets/issues/7/labels/bop"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/repos/octo/widgets/issues/7/labels"))
            .and(body_json(json!({"labels": ["hefty"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/repos/octo/widgets/issues/7/comments"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
            .expect(2)
            .mount(&server)
            .await;

        let summary = run_once(&client_for(&server), &Config::default(), false)
            .await
            .unwrap();
        assert_eq!(summary.applied, 2);
    }

    #[tokio::test]
    async fn test_one_broken_pr_does_not_sink_the_batch() {
        let server = MockServer::start().await;
        mount_issue_list(
            &server,
            json!([
                issue_json(1, "broken fetch", &["boop"]),
                issue_json(2, "tiny fix", &["boop"]),
            ]),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/pulls/1"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        mount_pr(
            &server,
            2,
            json!([{"state": "success"}]),
            json!([]),
            &diff_with_cost(10),
        )
        .await;
        Mock::given(method("POST"))
            .and(path("/repos/octo/widgets/issues/2/labels"))
            .and(body_json(json!({"labels": ["bop"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/repos/octo/widgets/issues/2/comments"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let summary = run_once(&client_for(&server), &Config::default(), false)
            .await
            .unwrap();
        assert_eq!(summary.evaluated, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.applied, 1);
    }

    #[tokio::test]
    async fn test_dry_run_applies_nothing() {
        let server = MockServer::start().await;
        mount_issue_list(&server, json!([issue_json(7, "tiny fix", &["boop"])])).await;
        mount_pr(
            &server,
            7,
            json!([{"state": "success"}]),
            json!([]),
            &diff_with_cost(10),
        )
        .await;
        Mock::given(method("POST"))
            .and(path("/repos/octo/widgets/issues/7/labels"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let summary = run_once(&client_for(&server), &Config::default(), true)
            .await
            .unwrap();
        assert_eq!(summary.applied, 0);
    }
}
